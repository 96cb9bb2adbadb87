use crate::entities::test_match::{MatchPolicy, MatchedTest};
use crate::sources::catalog::{CatalogMatchEntry, CatalogTest};

/// Rescales a catalog search score to a confidence in [0, 1].
///
/// The catalog ranks candidates on integer tiers: exact code match 100,
/// exact alias 90, partial code 50, partial alias 40, name match 30,
/// Medicare item 20, description 10. Missing scores decode to 0 upstream.
pub fn confidence_from_score(search_score: i64) -> f64 {
    (search_score as f64 / 100.0).clamp(0.0, 1.0)
}

/// Maps the top-ranked search candidate onto the original request. Ranking
/// is the catalog's; the first candidate is always taken.
pub fn matched_from_search(original: &str, term: &str, hit: &CatalogTest) -> MatchedTest {
    MatchedTest {
        original: original.to_string(),
        matched: hit.name.clone().unwrap_or_else(|| term.to_string()),
        test_id: hit.code.clone().unwrap_or_else(|| term.to_string()),
        confidence: confidence_from_score(hit.search_score),
    }
}

/// Maps one batch entry onto its request; entries the catalog left
/// unmatched fall back to the no-match passthrough.
pub fn matched_from_batch_entry(
    original: &str,
    term: &str,
    entry: &CatalogMatchEntry,
    policy: &MatchPolicy,
) -> MatchedTest {
    if !entry.matched {
        return MatchedTest::passthrough(original, term, policy.no_match);
    }
    MatchedTest {
        original: original.to_string(),
        matched: entry.name.clone().unwrap_or_else(|| term.to_string()),
        test_id: entry.code.clone().unwrap_or_else(|| term.to_string()),
        confidence: confidence_from_score(entry.search_score),
    }
}
