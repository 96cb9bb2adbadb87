//! Referral-level records handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::entities::test_match::MatchedTest;
use crate::sources::extraction::ReferralExtraction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// YYYY-MM-DD, as printed on the form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// M, F, or U.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicare_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Per-category extraction confidence plus the derived overall score, all in
/// [0, 1]. `overall` is never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub patient: f64,
    pub doctor: f64,
    pub tests: f64,
    pub overall: f64,
}

impl ConfidenceScores {
    /// `overall` is the unweighted arithmetic mean of the three categories.
    pub fn aggregate(patient: f64, doctor: f64, tests: f64) -> Self {
        Self {
            patient,
            doctor,
            tests,
            overall: (patient + doctor + tests) / 3.0,
        }
    }
}

/// Everything the caller gets for one scanned referral: the extracted
/// fields, the raw test list, its catalog matches, and the confidence block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralData {
    pub patient: PatientInfo,
    pub doctor: DoctorInfo,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub matched_tests: Vec<MatchedTest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_notes: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_date: Option<String>,
    pub confidence: ConfidenceScores,
}

/// Combines a successful extraction with its catalog matches.
pub fn assemble(extraction: ReferralExtraction, matched_tests: Vec<MatchedTest>) -> ReferralData {
    let confidence = ConfidenceScores::aggregate(
        extraction.confidence.patient,
        extraction.confidence.doctor,
        extraction.confidence.tests,
    );
    ReferralData {
        patient: extraction.patient,
        doctor: extraction.doctor,
        tests: extraction.tests,
        matched_tests,
        clinical_notes: extraction.clinical_notes,
        urgent: extraction.urgent,
        collection_date: extraction.collection_date,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::extraction::ExtractionConfidence;

    #[test]
    fn overall_is_the_unweighted_mean() {
        let cases = [
            (0.0, 0.0, 0.0),
            (1.0, 1.0, 1.0),
            (0.9, 0.6, 0.3),
            (0.5, 0.7, 0.2),
            (0.33, 0.44, 0.55),
        ];
        for (p, d, t) in cases {
            let scores = ConfidenceScores::aggregate(p, d, t);
            assert_eq!(scores.patient, p);
            assert_eq!(scores.doctor, d);
            assert_eq!(scores.tests, t);
            assert!(
                (scores.overall - (p + d + t) / 3.0).abs() < 1e-12,
                "overall for ({p},{d},{t})"
            );
        }
    }

    #[test]
    fn assemble_carries_extraction_fields_and_derives_overall() {
        let extraction = ReferralExtraction {
            tests: vec!["FBC".into(), "EIFT".into()],
            clinical_notes: Some("fatigue".into()),
            urgent: true,
            collection_date: Some("2025-11-03".into()),
            confidence: ExtractionConfidence {
                patient: 0.9,
                doctor: 0.6,
                tests: 0.9,
            },
            ..ReferralExtraction::default()
        };

        let data = assemble(extraction, Vec::new());
        assert_eq!(data.tests, vec!["FBC", "EIFT"]);
        assert!(data.urgent);
        assert!((data.confidence.overall - 0.8).abs() < 1e-12);
    }

    #[test]
    fn referral_data_serializes_with_camel_case_aliases() {
        let data = assemble(ReferralExtraction::default(), Vec::new());
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("matchedTests").is_some());
        assert!(json.get("matched_tests").is_none());
        assert!(json.get("confidence").is_some());
    }
}
