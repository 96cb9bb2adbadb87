//! Test matching against the catalog.
//!
//! Degradation is a visible branch, never a raised failure: every normalized
//! term produces exactly one `MatchedTest`, with policy-fixed low confidence
//! standing in when the catalog cannot confirm identity.

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RefMatchError;
use crate::sources::catalog::{CATALOG_API, CatalogClient, MAX_BATCH_TERMS};
use crate::transform;
use crate::transform::terms;

/// One test request resolved against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedTest {
    /// The request string as written on the referral.
    pub original: String,
    /// Display name from the catalog, or the search term echoed back on a
    /// degraded match.
    pub matched: String,
    pub test_id: String,
    /// Always populated, in [0, 1]; degraded paths use `MatchPolicy` values.
    pub confidence: f64,
}

impl MatchedTest {
    pub(crate) fn passthrough(original: &str, term: &str, confidence: f64) -> Self {
        Self {
            original: original.to_string(),
            matched: term.to_string(),
            test_id: term.to_string(),
            confidence,
        }
    }
}

/// Degraded-confidence constants. Fixed heuristics carried over from the
/// original calibration; overridable, not recalibrated.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Catalog answered but could not confirm identity.
    pub no_match: f64,
    /// Timeout, transport, or malformed-response failure.
    pub transport_failure: f64,
    /// Empty input, never sent to the catalog.
    pub empty_term: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            no_match: 0.3,
            transport_failure: 0.2,
            empty_term: 0.0,
        }
    }
}

/// Matches a single term. Never fails: catalog trouble degrades to a
/// passthrough result with policy confidence.
pub async fn match_one(catalog: &CatalogClient, policy: &MatchPolicy, term: &str) -> MatchedTest {
    match_term(catalog, policy, term, term).await
}

async fn match_term(
    catalog: &CatalogClient,
    policy: &MatchPolicy,
    original: &str,
    term: &str,
) -> MatchedTest {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return MatchedTest::passthrough(original, term, policy.empty_term);
    }

    match catalog.search(trimmed).await {
        Ok(resp) => match resp.tests.first() {
            Some(hit) => transform::catalog::matched_from_search(original, term, hit),
            None => {
                debug!(term = trimmed, "no catalog match");
                MatchedTest::passthrough(original, term, policy.no_match)
            }
        },
        Err(err @ RefMatchError::Api { .. }) => {
            warn!(term = trimmed, error = %err, "catalog search rejected");
            MatchedTest::passthrough(original, term, policy.no_match)
        }
        Err(err) => {
            warn!(term = trimmed, error = %err, "catalog search failed");
            MatchedTest::passthrough(original, term, policy.transport_failure)
        }
    }
}

struct NormalizedRequest {
    /// Raw request string this term came from; results are matched back to
    /// it, not to the normalized term.
    original: String,
    term: String,
}

/// Matches every raw test request: normalize, batch against the catalog,
/// and on any batch-level failure fall back to concurrent per-term searches.
/// Returns exactly one result per normalized term, in input order.
pub async fn match_tests(
    catalog: &CatalogClient,
    policy: &MatchPolicy,
    raw_tests: &[String],
) -> Vec<MatchedTest> {
    let requests: Vec<NormalizedRequest> = raw_tests
        .iter()
        .flat_map(|raw| {
            terms::normalize(raw)
                .into_iter()
                .map(|term| NormalizedRequest {
                    original: raw.clone(),
                    term,
                })
        })
        .collect();
    if requests.is_empty() {
        return Vec::new();
    }

    match match_via_batch(catalog, policy, &requests).await {
        Ok(results) => results,
        Err(err) => {
            warn!(
                error = %err,
                terms = requests.len(),
                "batch match failed; falling back to per-term search"
            );
            join_all(
                requests
                    .iter()
                    .map(|req| match_term(catalog, policy, &req.original, &req.term)),
            )
            .await
        }
    }
}

async fn match_via_batch(
    catalog: &CatalogClient,
    policy: &MatchPolicy,
    requests: &[NormalizedRequest],
) -> Result<Vec<MatchedTest>, RefMatchError> {
    let names: Vec<String> = requests.iter().map(|req| req.term.clone()).collect();
    let responses = try_join_all(
        names
            .chunks(MAX_BATCH_TERMS)
            .map(|chunk| catalog.match_batch(chunk)),
    )
    .await?;

    let entries: Vec<_> = responses
        .into_iter()
        .flat_map(|resp| resp.matches)
        .collect();
    // Alignment is the batch contract; a count mismatch means the response
    // cannot be trusted and the per-term fallback takes over.
    if entries.len() != requests.len() {
        return Err(RefMatchError::Api {
            api: CATALOG_API.to_string(),
            message: format!(
                "Batch match returned {} entries for {} terms",
                entries.len(),
                requests.len()
            ),
        });
    }

    Ok(requests
        .iter()
        .zip(entries.iter())
        .map(|(req, entry)| {
            transform::catalog::matched_from_batch_entry(&req.original, &req.term, entry, policy)
        })
        .collect())
}
