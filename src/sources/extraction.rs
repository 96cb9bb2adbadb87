//! Boundary for the image → structured-referral extraction collaborator.
//!
//! The extraction call itself (a vision model reading the scanned form) is an
//! external collaborator; this module only defines the seam: the wire shape
//! it produces and the trait the caller hands us. Payloads are decoded into a
//! tagged outcome so the error marker is a visible variant, not a caught
//! failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::referral::{DoctorInfo, PatientInfo};
use crate::error::RefMatchError;

const EXTRACTION_API: &str = "referral-extraction";

/// Per-category extraction confidence, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExtractionConfidence {
    #[serde(default)]
    pub patient: f64,
    #[serde(default)]
    pub doctor: f64,
    #[serde(default)]
    pub tests: f64,
}

/// Structured fields read off one referral form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralExtraction {
    #[serde(default)]
    pub patient: PatientInfo,
    #[serde(default)]
    pub doctor: DoctorInfo,
    /// Requested tests, exactly as written on the form.
    #[serde(default)]
    pub tests: Vec<String>,
    pub clinical_notes: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    pub collection_date: Option<String>,
    #[serde(default)]
    pub confidence: ExtractionConfidence,
}

/// What the collaborator produced: structured fields, or its error marker
/// (e.g. "Not a pathology referral"). A rejection is a hard failure for the
/// caller; the matching pipeline is not invoked on it.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Extracted(ReferralExtraction),
    Rejected(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireOutcome {
    Rejected { error: String },
    Extracted(ReferralExtraction),
}

/// Decodes a collaborator payload into the tagged outcome.
pub fn parse_extraction(payload: &[u8]) -> Result<ExtractionOutcome, RefMatchError> {
    let wire: WireOutcome =
        serde_json::from_slice(payload).map_err(|source| RefMatchError::ApiJson {
            api: EXTRACTION_API.to_string(),
            source,
        })?;
    Ok(match wire {
        WireOutcome::Rejected { error } => ExtractionOutcome::Rejected(error),
        WireOutcome::Extracted(extraction) => ExtractionOutcome::Extracted(extraction),
    })
}

#[async_trait]
pub trait ReferralExtractor: Send + Sync {
    /// Extracts structured referral data from image bytes.
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractionOutcome, RefMatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_marker_decodes_as_rejected() {
        let outcome = parse_extraction(br#"{"error": "Not a pathology referral"}"#).unwrap();
        match outcome {
            ExtractionOutcome::Rejected(reason) => {
                assert_eq!(reason, "Not a pathology referral");
            }
            ExtractionOutcome::Extracted(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn full_payload_decodes_with_camel_case_aliases() {
        let payload = serde_json::json!({
            "patient": {
                "firstName": "Jane",
                "lastName": "Citizen",
                "dateOfBirth": "1975-04-02",
                "sex": "F",
                "medicareNumber": "2951839461"
            },
            "doctor": {
                "name": "Dr A Example",
                "providerNumber": "2426621B",
                "practice": "Example Family Practice"
            },
            "tests": ["FBC", "Vit B12/Folate"],
            "clinicalNotes": "fatigue, pallor",
            "urgent": true,
            "collectionDate": "2025-11-03",
            "confidence": {"patient": 0.9, "doctor": 0.8, "tests": 0.7}
        });

        let outcome = parse_extraction(payload.to_string().as_bytes()).unwrap();
        let ExtractionOutcome::Extracted(extraction) = outcome else {
            panic!("expected extraction");
        };
        assert_eq!(extraction.patient.first_name.as_deref(), Some("Jane"));
        assert_eq!(extraction.doctor.provider_number.as_deref(), Some("2426621B"));
        assert_eq!(extraction.tests, vec!["FBC", "Vit B12/Folate"]);
        assert!(extraction.urgent);
        assert_eq!(extraction.confidence.tests, 0.7);
    }

    #[test]
    fn missing_optional_fields_default() {
        let outcome = parse_extraction(br#"{"tests": ["FBC"]}"#).unwrap();
        let ExtractionOutcome::Extracted(extraction) = outcome else {
            panic!("expected extraction");
        };
        assert!(extraction.patient.first_name.is_none());
        assert!(!extraction.urgent);
        assert_eq!(extraction.confidence.patient, 0.0);
    }
}
