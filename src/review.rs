//! Deterministic review of a proposed plan
//!
//! A rule-based second opinion on a recommendation or reviewer choice:
//! - Paid bloat always rejects
//! - Family mismatch, soft matches or a long extras list warn
//! - Anything else is approved
//!
//! Also hosts GA visibility per account and the fixed key order used when
//! handing feature breakdowns to review tooling.

use crate::engine::MigrationEngine;
use crate::types::AccountRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// More extras than this always warrants a second look
pub const MAX_QUIET_EXTRAS: usize = 5;

/// Key order expected by review tooling
pub const FEATURE_KEY_ORDER: &[&str] = &[
    "plan",
    "extras",
    "bloat_features",
    "bloat_costly",
    "gaFeatures",
    "irrelevantFeatures",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewClassification {
    Approved,
    Warning,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub classification: ReviewClassification,
    /// Extras that canonically equal a feature the account already has
    pub soft_matches: Vec<String>,
    pub paid_bloat: Vec<String>,
    pub subtype_aligned: bool,
    pub notes: Vec<String>,
}

/// Review a plan choice for one account
pub fn review_recommendation<S1, S2, S3>(
    engine: &MigrationEngine,
    subtype: Option<&str>,
    user_features: &[S1],
    plan: &str,
    extras: &[S2],
    bloat: &[S3],
) -> ReviewSummary
where
    S1: AsRef<str>,
    S2: AsRef<str>,
    S3: AsRef<str>,
{
    let canon = engine.canonicalizer();

    let paid_bloat: Vec<String> = bloat
        .iter()
        .map(|b| b.as_ref().trim())
        .filter(|b| engine.is_costly(b))
        .map(str::to_string)
        .collect();

    let user_raw: BTreeSet<&str> = user_features.iter().map(|f| f.as_ref().trim()).collect();
    let user: BTreeSet<String> = canon
        .canonicalize_all(user_features.iter().map(|f| f.as_ref()))
        .into_iter()
        .collect();
    // An extra spelled differently from the account's flag but resolving to it
    let soft_matches: Vec<String> = extras
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty() && !user_raw.contains(e))
        .map(|e| canon.canonicalize(e))
        .filter(|e| user.contains(e))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let subtype_aligned = engine.subtypes().is_aligned(subtype, plan);
    let extras_count = extras
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .count();

    let mut notes = Vec::new();
    if !paid_bloat.is_empty() {
        notes.push(format!("Grants paid features for free: {}", paid_bloat.join(", ")));
    }
    if !subtype_aligned {
        notes.push(format!(
            "Plan '{}' does not match subtype '{}'",
            plan,
            subtype.unwrap_or("Unknown")
        ));
    }
    if !soft_matches.is_empty() {
        notes.push(format!(
            "Extras already used under another name: {}",
            soft_matches.join(", ")
        ));
    }
    if extras_count > MAX_QUIET_EXTRAS {
        notes.push(format!("{} extras to add individually", extras_count));
    }

    let classification = if !paid_bloat.is_empty() {
        ReviewClassification::Reject
    } else if !subtype_aligned || !soft_matches.is_empty() || extras_count > MAX_QUIET_EXTRAS {
        ReviewClassification::Warning
    } else {
        ReviewClassification::Approved
    };

    ReviewSummary {
        classification,
        soft_matches,
        paid_bloat,
        subtype_aligned,
        notes,
    }
}

// ============================================================================
// GA VISIBILITY
// ============================================================================

/// Which GA features an account already sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaVisibility {
    pub name: String,
    pub ga_present: Vec<String>,
    pub ga_missing: Vec<String>,
    pub ga_present_count: usize,
    pub ga_missing_count: usize,
    pub ga_total: usize,
}

pub fn ga_visibility(account: &AccountRow, engine: &MigrationEngine) -> GaVisibility {
    let ga = engine.classifier().ga_set();
    let user: BTreeSet<String> = engine
        .canonicalizer()
        .canonicalize_all(&account.features)
        .into_iter()
        .collect();

    let ga_present: Vec<String> = ga.intersection(&user).cloned().collect();
    let ga_missing: Vec<String> = ga.difference(&user).cloned().collect();

    GaVisibility {
        name: account.display_name().trim().to_string(),
        ga_present_count: ga_present.len(),
        ga_missing_count: ga_missing.len(),
        ga_total: ga.len(),
        ga_present,
        ga_missing,
    }
}

/// Copy the feature breakdown keys into their fixed order.
///
/// Missing keys become `[]`; other keys are dropped.
pub fn reorder_features(data: &Value) -> Value {
    let mut out = Map::new();
    for key in FEATURE_KEY_ORDER {
        let value = data
            .get(*key)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        out.insert(key.to_string(), value);
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sources::PlanSource;
    use serde_json::json;

    fn engine() -> MigrationEngine {
        let config = EngineConfig {
            ga_features: vec!["mapView".to_string(), "vesselSearch".to_string()],
            ..EngineConfig::default()
        };
        MigrationEngine::new(
            &PlanSource::new().with_plan("Bunkering Core", &["portStateControl"]),
            config,
        )
    }

    const NONE: &[&str] = &[];

    #[test]
    fn test_paid_bloat_rejects() {
        let summary = review_recommendation(
            &engine(),
            Some("Bunkering"),
            &["Port Control"],
            "Bunkering Core",
            NONE,
            &["UBOdata"],
        );
        assert_eq!(summary.classification, ReviewClassification::Reject);
        assert_eq!(summary.paid_bloat, vec!["UBOdata"]);
    }

    #[test]
    fn test_warnings() {
        let e = engine();
        let misaligned = review_recommendation(&e, Some("Shipowner"), &["a"], "Bunkering Core", NONE, NONE);
        assert_eq!(misaligned.classification, ReviewClassification::Warning);
        assert!(!misaligned.subtype_aligned);

        let soft = review_recommendation(
            &e,
            Some("Bunkering"),
            &["portStateControl"],
            "Bunkering Core",
            &["Port Control"],
            NONE,
        );
        assert_eq!(soft.classification, ReviewClassification::Warning);
        assert_eq!(soft.soft_matches, vec!["portStateControl"]);

        let many = review_recommendation(
            &e,
            Some("Bunkering"),
            NONE,
            "Bunkering Core",
            &["a", "b", "c", "d", "e", "f"],
            NONE,
        );
        assert_eq!(many.classification, ReviewClassification::Warning);
        assert_eq!(many.notes.len(), 1);
    }

    #[test]
    fn test_clean_choice_is_approved() {
        let summary = review_recommendation(
            &engine(),
            Some("Bunkering"),
            &["Port Control", "x"],
            "Bunkering Core",
            &["x"],
            NONE,
        );
        assert_eq!(summary.classification, ReviewClassification::Approved);
        assert!(summary.notes.is_empty());
        assert_eq!(serde_json::to_value(summary.classification).unwrap(), json!("APPROVED"));
    }

    #[test]
    fn test_ga_visibility() {
        let row = AccountRow::new("Bunkering", &["MAPVIEW", "other"]).with_name(" Acme ");
        let vis = ga_visibility(&row, &engine());
        assert_eq!(vis.name, "Acme");
        assert_eq!(vis.ga_present, vec!["mapView"]);
        assert_eq!(vis.ga_missing, vec!["vesselSearch"]);
        assert_eq!(vis.ga_total, 2);
    }

    #[test]
    fn test_reorder_features() {
        let data = json!({
            "irrelevantFeatures": ["i"],
            "extras": ["e"],
            "plan": "Bunkering Core",
            "unrelated": 1,
        });
        let out = reorder_features(&data);
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, FEATURE_KEY_ORDER.to_vec());
        assert_eq!(out["plan"], json!("Bunkering Core"));
        assert_eq!(out["bloat_costly"], json!([]));
        assert!(out.get("unrelated").is_none());
    }
}
