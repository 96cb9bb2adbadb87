//! Test-request normalization.
//!
//! Turns one raw request string into zero or more catalog-searchable terms:
//! panel recognition ("EIFT" → its constituent codes), compound splitting
//! ("FBC+UEC"), and abbreviation expansion ("FBE" → "FBC"). Pure and
//! deterministic; the dictionaries are fixed for the process lifetime.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Abbreviations common on Australian pathology referrals. Applied whole-word
/// only, so "Vit" never rewrites "Vital".
const ABBREVIATIONS: &[(&str, &str)] = &[
    // Vitamins
    ("Vit", "Vitamin"),
    ("Vit.", "Vitamin"),
    // Haematology
    ("FBE", "FBC"),
    ("Hb", "Haemoglobin"),
    ("Hgb", "Haemoglobin"),
    ("WCC", "WBC"),
    ("RCC", "RBC"),
    // Electrolytes / biochemistry
    ("U&E", "UEC"),
    ("E/LFT", "EUC/LFT"),
    ("Na", "Sodium"),
    ("K", "Potassium"),
    ("Ca", "Calcium"),
    ("Mg", "Magnesium"),
    // Liver function
    ("LFT's", "LFT"),
    ("LFTS", "LFT"),
    // Thyroid
    ("TFT's", "TFT"),
    ("TFTS", "TFT"),
];

/// Panels: one request string standing for several discrete tests.
const PANELS: &[(&str, &[&str])] = &[
    ("EIFT", &["UEC", "IRON", "FERR", "TFT"]),
    ("Cardiac Panel", &["TROP", "BNP", "CK", "CKMB"]),
    ("Anemia Panel", &["FBC", "IRON", "FERR", "B12", "FOL"]),
    ("Diabetes Panel", &["HBA1C", "GLUCOSE", "FRUCTOSAMINE"]),
    ("Lipid Panel", &["CHOL", "TRIG", "HDL", "LDL"]),
    ("Liver Panel", &["LFT", "GGT", "ALP"]),
    ("Renal Panel", &["UEC", "CREAT", "eGFR"]),
];

/// Compound separators in precedence order; the first one present wins.
const SEPARATORS: &[&str] = &["/", " & ", " and ", "+", ","];

/// Split parts are re-normalized recursively (a part can itself be a
/// compound or an abbreviation); bounded against separator soup.
const MAX_SPLIT_DEPTH: usize = 8;

fn abbreviation_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ABBREVIATIONS
            .iter()
            .map(|(abbrev, expansion)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(abbrev));
                (
                    Regex::new(&pattern).expect("valid abbreviation pattern"),
                    *expansion,
                )
            })
            .collect()
    })
}

/// Normalizes one raw test request into searchable terms.
///
/// Empty or whitespace-only input yields no terms. Precedence is strict:
/// panel recognition, then compound splitting, then abbreviation expansion,
/// then the trimmed input unchanged.
pub fn normalize(raw: &str) -> Vec<String> {
    normalize_depth(raw, 0)
}

fn normalize_depth(raw: &str, depth: usize) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(tests) = panel_tests(trimmed) {
        debug!(term = trimmed, ?tests, "recognized panel");
        return tests.iter().map(|code| (*code).to_string()).collect();
    }

    if depth < MAX_SPLIT_DEPTH {
        let parts = split_compound(trimmed);
        if parts.len() > 1 {
            debug!(term = trimmed, parts = parts.len(), "split compound request");
            return parts
                .iter()
                .flat_map(|part| normalize_depth(part, depth + 1))
                .collect();
        }
    }

    let expanded = expand_abbreviations(trimmed);
    if expanded != trimmed {
        debug!(term = trimmed, expanded = expanded.as_str(), "expanded abbreviations");
        return vec![expanded];
    }

    vec![trimmed.to_string()]
}

/// Exact (case-insensitive) panel lookup. No partial matching: a panel name
/// embedded in a longer string is not a panel.
pub fn panel_tests(term: &str) -> Option<&'static [&'static str]> {
    let trimmed = term.trim();
    PANELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, tests)| *tests)
}

pub fn is_compound(term: &str) -> bool {
    SEPARATORS.iter().any(|sep| term.contains(sep))
}

fn split_compound(term: &str) -> Vec<&str> {
    for sep in SEPARATORS {
        if term.contains(sep) {
            let parts: Vec<&str> = term
                .split(sep)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
            if parts.len() > 1 {
                return parts;
            }
        }
    }
    vec![term]
}

fn expand_abbreviations(term: &str) -> String {
    // Exact whole-string keys first ("FBE" alone on a line).
    if let Some((_, expansion)) = ABBREVIATIONS.iter().find(|(abbrev, _)| *abbrev == term) {
        return (*expansion).to_string();
    }

    let mut result = term.to_string();
    for (pattern, expansion) in abbreviation_patterns() {
        if pattern.is_match(&result) {
            result = pattern.replace_all(&result, *expansion).into_owned();
        }
    }
    result
}
