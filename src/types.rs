//! Core types for plan migration recommendations
//!
//! Results are tagged enums rather than loose maps: callers branch on the
//! variant, and serde writes the same `status` strings and field names the
//! review UIs and exporters already consume.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder plan reported when no plan could be chosen
pub const MANUAL_REVIEW: &str = "Manual Review";

/// One account as read from the mapping table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub name: Option<String>,
    /// Business subtype, e.g. "Bunkering" or "Shipowner / Operator"
    pub subtype: Option<String>,
    /// Raw feature flags, not yet canonicalized
    pub features: Vec<String>,
}

impl AccountRow {
    pub fn new<S: AsRef<str>>(subtype: &str, features: &[S]) -> Self {
        Self {
            name: None,
            subtype: Some(subtype.to_string()),
            features: features.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Every status the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationStatus {
    #[serde(rename = "Success")]
    Success,
    #[serde(rename = "NO_MATCHING_PLANS")]
    NoMatchingPlans,
    #[serde(rename = "No Valid Plans")]
    NoValidPlans,
    #[serde(rename = "REJECTED_RED_LINE")]
    RejectedRedLine,
    #[serde(rename = "APPROVED_BY_CSM")]
    ApprovedByCsm,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Success => "Success",
            RecommendationStatus::NoMatchingPlans => "NO_MATCHING_PLANS",
            RecommendationStatus::NoValidPlans => "No Valid Plans",
            RecommendationStatus::RejectedRedLine => "REJECTED_RED_LINE",
            RecommendationStatus::ApprovedByCsm => "APPROVED_BY_CSM",
        }
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An add-on bundle applied to a candidate, with the features it supplies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAddOn {
    pub name: String,
    /// Account features the base plan lacks and this bundle provides
    pub supplied: Vec<String>,
}

/// Scored evaluation of one (account, plan) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAnalysis {
    pub plan: String,
    pub covered_features: Vec<String>,
    /// What a reviewer sees: individual extras plus applied add-on names
    pub extras: Vec<String>,
    /// Features to add one by one; drives ranking
    pub feature_extras: Vec<String>,
    pub applied_add_ons: Vec<AppliedAddOn>,
    pub bloat_features: Vec<String>,
    pub bloat_score: usize,
    pub bloat_costly: Vec<String>,
    pub bloat_costly_count: usize,
    pub bloat_weighted: u64,
    pub extras_count: usize,
    pub coverage_count: usize,
    pub business_value_score: f64,
    pub subtype_aligned: bool,
    pub missing_critical: usize,
    /// Costly bloat present; never eligible to win
    pub rejected: bool,
    #[serde(rename = "gaFeatures")]
    pub ga_features: Vec<String>,
    #[serde(rename = "irrelevantFeatures")]
    pub irrelevant_features: Vec<String>,
    #[serde(rename = "planFeatures")]
    pub plan_features: Vec<String>,
    #[serde(rename = "accountFeatures")]
    pub account_features: Vec<String>,
    #[serde(rename = "missingFeatures")]
    pub missing_features: Vec<String>,
}

impl CandidateAnalysis {
    pub fn is_valid(&self) -> bool {
        !self.rejected
    }

    pub fn applied_add_on_names(&self) -> Vec<String> {
        self.applied_add_ons.iter().map(|a| a.name.clone()).collect()
    }
}

/// Payload of a successful recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedPlan {
    pub recommended_plan: String,
    pub covered_features: Vec<String>,
    pub extras: Vec<String>,
    pub feature_extras: Vec<String>,
    pub applied_add_ons: Vec<AppliedAddOn>,
    pub bloat_features: Vec<String>,
    pub bloat_score: usize,
    pub bloat_costly: Vec<String>,
    pub bloat_costly_count: usize,
    pub bloat_weighted: u64,
    pub extras_count: usize,
    pub coverage_count: usize,
    pub business_value_score: f64,
    pub ambiguous_mapping: bool,
    pub unrecognized_features: Vec<String>,
    pub migration_confidence: f64,
    #[serde(rename = "gaFeatures")]
    pub ga_features: Vec<String>,
    #[serde(rename = "irrelevantFeatures")]
    pub irrelevant_features: Vec<String>,
    #[serde(rename = "planFeatures")]
    pub plan_features: Vec<String>,
    #[serde(rename = "accountFeatures")]
    pub account_features: Vec<String>,
    #[serde(rename = "missingFeatures")]
    pub missing_features: Vec<String>,
    pub why: String,
    /// Valid candidates, best first
    pub all_candidates: Vec<CandidateAnalysis>,
    /// Every evaluated candidate in catalog order, rejected ones included
    pub all_plans: Vec<CandidateAnalysis>,
}

/// Zeroed payload for recommendations that could not pick a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unresolved {
    pub recommended_plan: String,
    pub reason: String,
    pub covered_features: Vec<String>,
    pub extras: Vec<String>,
    pub bloat_features: Vec<String>,
    pub bloat_score: usize,
    pub bloat_costly: Vec<String>,
    pub bloat_costly_count: usize,
    pub bloat_weighted: u64,
    pub extras_count: usize,
    pub ambiguous_mapping: bool,
    pub unrecognized_features: Vec<String>,
    pub migration_confidence: f64,
    pub all_candidates: Vec<CandidateAnalysis>,
    pub all_plans: Vec<CandidateAnalysis>,
}

impl Unresolved {
    pub fn new(
        reason: String,
        unrecognized_features: Vec<String>,
        all_plans: Vec<CandidateAnalysis>,
    ) -> Self {
        Self {
            recommended_plan: MANUAL_REVIEW.to_string(),
            reason,
            covered_features: Vec::new(),
            extras: Vec::new(),
            bloat_features: Vec::new(),
            bloat_score: 0,
            bloat_costly: Vec::new(),
            bloat_costly_count: 0,
            bloat_weighted: 0,
            extras_count: 0,
            ambiguous_mapping: false,
            unrecognized_features,
            migration_confidence: 0.0,
            all_candidates: Vec::new(),
            all_plans,
        }
    }
}

/// Result of `MigrationEngine::recommend`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Recommendation {
    #[serde(rename = "Success")]
    Success(RecommendedPlan),
    #[serde(rename = "NO_MATCHING_PLANS")]
    NoMatchingPlans(Unresolved),
    #[serde(rename = "No Valid Plans")]
    NoValidPlans(Unresolved),
}

impl Recommendation {
    pub fn status(&self) -> RecommendationStatus {
        match self {
            Recommendation::Success(_) => RecommendationStatus::Success,
            Recommendation::NoMatchingPlans(_) => RecommendationStatus::NoMatchingPlans,
            Recommendation::NoValidPlans(_) => RecommendationStatus::NoValidPlans,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Recommendation::Success(_))
    }

    pub fn as_success(&self) -> Option<&RecommendedPlan> {
        match self {
            Recommendation::Success(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn recommended_plan(&self) -> &str {
        match self {
            Recommendation::Success(p) => &p.recommended_plan,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.recommended_plan
            }
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Recommendation::Success(_) => None,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                Some(&u.reason)
            }
        }
    }

    pub fn extras(&self) -> &[String] {
        match self {
            Recommendation::Success(p) => &p.extras,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => &u.extras,
        }
    }

    pub fn bloat_features(&self) -> &[String] {
        match self {
            Recommendation::Success(p) => &p.bloat_features,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.bloat_features
            }
        }
    }

    pub fn bloat_costly(&self) -> &[String] {
        match self {
            Recommendation::Success(p) => &p.bloat_costly,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.bloat_costly
            }
        }
    }

    pub fn migration_confidence(&self) -> f64 {
        match self {
            Recommendation::Success(p) => p.migration_confidence,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                u.migration_confidence
            }
        }
    }

    pub fn ambiguous_mapping(&self) -> bool {
        match self {
            Recommendation::Success(p) => p.ambiguous_mapping,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                u.ambiguous_mapping
            }
        }
    }

    pub fn unrecognized_features(&self) -> &[String] {
        match self {
            Recommendation::Success(p) => &p.unrecognized_features,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.unrecognized_features
            }
        }
    }

    pub fn all_candidates(&self) -> &[CandidateAnalysis] {
        match self {
            Recommendation::Success(p) => &p.all_candidates,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.all_candidates
            }
        }
    }

    pub fn all_plans(&self) -> &[CandidateAnalysis] {
        match self {
            Recommendation::Success(p) => &p.all_plans,
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                &u.all_plans
            }
        }
    }
}

/// Override payload accepted by the red-line check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedOverride {
    pub final_plan: String,
    pub extras: Vec<String>,
    pub covered_features: Vec<String>,
    pub bloat_features: Vec<String>,
    pub bloat_score: usize,
    pub bloat_costly: Vec<String>,
    pub bloat_costly_count: usize,
    #[serde(rename = "gaFeatures")]
    pub ga_features: Vec<String>,
    #[serde(rename = "irrelevantFeatures")]
    pub irrelevant_features: Vec<String>,
}

/// Override refused because it would grant costly features for free
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedLineRejection {
    pub reason: String,
    pub paid_bloat: Vec<String>,
}

/// Result of `MigrationEngine::apply_human_override`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum OverrideOutcome {
    #[serde(rename = "APPROVED_BY_CSM")]
    Approved(ApprovedOverride),
    #[serde(rename = "REJECTED_RED_LINE")]
    Rejected(RedLineRejection),
}

impl OverrideOutcome {
    pub fn status(&self) -> RecommendationStatus {
        match self {
            OverrideOutcome::Approved(_) => RecommendationStatus::ApprovedByCsm,
            OverrideOutcome::Rejected(_) => RecommendationStatus::RejectedRedLine,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, OverrideOutcome::Approved(_))
    }

    pub fn paid_bloat(&self) -> &[String] {
        match self {
            OverrideOutcome::Approved(a) => &a.bloat_costly,
            OverrideOutcome::Rejected(r) => &r.paid_bloat,
        }
    }
}

/// Bloat metrics for a plan plus extras, without GA/Irrelevant filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloatStats {
    pub bloat_features: Vec<String>,
    pub bloat_costly: Vec<String>,
    pub bloat_score: usize,
    pub bloat_costly_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_strings() {
        assert_eq!(RecommendationStatus::NoValidPlans.as_str(), "No Valid Plans");
        assert_eq!(
            serde_json::to_value(RecommendationStatus::RejectedRedLine).unwrap(),
            json!("REJECTED_RED_LINE")
        );
        assert_eq!(RecommendationStatus::ApprovedByCsm.to_string(), "APPROVED_BY_CSM");
    }

    #[test]
    fn test_unresolved_serializes_flat_with_status() {
        let rec = Recommendation::NoMatchingPlans(Unresolved::new(
            "No plans found for subtype 'Unknown'".to_string(),
            vec!["x".to_string()],
            Vec::new(),
        ));
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["status"], json!("NO_MATCHING_PLANS"));
        assert_eq!(value["recommended_plan"], json!(MANUAL_REVIEW));
        assert_eq!(value["extras_count"], json!(0));
        assert_eq!(value["unrecognized_features"], json!(["x"]));

        let back: Recommendation = serde_json::from_value(value).unwrap();
        assert_eq!(back.status(), RecommendationStatus::NoMatchingPlans);
        assert_eq!(back.reason(), Some("No plans found for subtype 'Unknown'"));
    }

    #[test]
    fn test_override_rejection_shape() {
        let outcome = OverrideOutcome::Rejected(RedLineRejection {
            reason: "Override introduces paid bloat".to_string(),
            paid_bloat: vec!["uboData".to_string()],
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], json!("REJECTED_RED_LINE"));
        assert_eq!(value["paid_bloat"], json!(["uboData"]));
        assert!(!outcome.is_approved());
        assert_eq!(outcome.paid_bloat(), ["uboData".to_string()]);
    }

    #[test]
    fn test_account_row_builder() {
        let row = AccountRow::new("Bunkering", &["Port Control"]).with_name("Acme");
        assert_eq!(row.display_name(), "Acme");
        assert_eq!(row.subtype.as_deref(), Some("Bunkering"));
        assert_eq!(row.features, vec!["Port Control".to_string()]);
    }
}
