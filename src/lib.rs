//! Pathology referral test matching.
//!
//! Turns freeform test-request strings, as extracted from a scanned referral
//! form, into catalog-identified tests with calibrated confidence: normalize
//! (panels, compounds, abbreviations), resolve against the test catalog
//! (batch preferred, per-term fallback), and aggregate extraction confidence.

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod sources;
pub mod transform;
