//! Candidate evaluation
//!
//! Scores one (account, plan) pair:
//! - covered  = user ∩ plan (plan includes applied add-on features)
//! - extras   = user − plan, to be added one by one
//! - bloat    = plan − user, granted but unused
//! - costly   = bloat ∩ cost set; any costly bloat rejects the candidate
//!
//! All set math runs on the Normal bucket only.

use crate::canonical::Canonicalizer;
use crate::catalog::PlanCatalog;
use crate::classify::{Classified, FeatureClassifier};
use crate::config::ScoringWeights;
use crate::subtype::SubtypeFilter;
use crate::types::{BloatStats, CandidateAnalysis};
use std::collections::{BTreeSet, HashSet};

/// Canonical, classified view of an account's features
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub raw: Vec<String>,
    pub canonical: BTreeSet<String>,
    pub classified: Classified,
    /// Raw names that needed a synonym or alias to resolve
    pub synonym_hits: BTreeSet<String>,
}

impl UserProfile {
    pub fn build<S: AsRef<str>>(
        raw: &[S],
        canon: &Canonicalizer,
        classifier: &FeatureClassifier,
    ) -> Self {
        let raw: Vec<String> = raw.iter().map(|f| f.as_ref().to_string()).collect();
        let canonical: BTreeSet<String> = canon.canonicalize_all(&raw).into_iter().collect();
        let synonym_hits = raw
            .iter()
            .filter(|f| canon.is_synonym_hit(f))
            .map(|f| f.trim().to_string())
            .collect();
        let classified = classifier.classify(&canonical);
        Self {
            raw,
            canonical,
            classified,
            synonym_hits,
        }
    }

    pub fn normal(&self) -> &BTreeSet<String> {
        &self.classified.normal
    }

    /// Denominator of every coverage ratio
    pub fn user_count(&self) -> usize {
        self.canonical.len()
    }
}

/// Borrowed view over everything needed to score candidates
pub struct CandidateEvaluator<'a> {
    pub catalog: &'a PlanCatalog,
    pub classifier: &'a FeatureClassifier,
    pub subtypes: &'a SubtypeFilter,
    /// Lowercased costly feature names
    pub cost_set: &'a HashSet<String>,
    pub critical: &'a BTreeSet<String>,
    pub weights: &'a ScoringWeights,
    pub cost_bloat_weight: u32,
}

impl<'a> CandidateEvaluator<'a> {
    pub fn evaluate(&self, plan: &str, user: &UserProfile, subtype: Option<&str>) -> CandidateAnalysis {
        let base_features: BTreeSet<String> = self
            .catalog
            .plan(plan)
            .map(|p| p.features.clone())
            .unwrap_or_default();
        let base = self.classifier.classify(&base_features);
        let user_normal = user.normal();

        let applied_add_ons = self.catalog.applied_add_ons(&base.normal, user_normal);
        let mut plan_normal = base.normal.clone();
        for add_on in &applied_add_ons {
            plan_normal.extend(add_on.supplied.iter().cloned());
        }

        let covered: Vec<String> = user_normal.intersection(&plan_normal).cloned().collect();
        let feature_extras: Vec<String> = user_normal.difference(&plan_normal).cloned().collect();
        let bloat: Vec<String> = plan_normal.difference(user_normal).cloned().collect();
        let bloat_costly: Vec<String> = bloat.iter().filter(|b| is_costly(b, self.cost_set)).cloned().collect();

        let bloat_weighted =
            bloat.len() as u64 + u64::from(self.cost_bloat_weight) * bloat_costly.len() as u64;
        let subtype_aligned = self.subtypes.is_aligned(subtype, plan);
        let missing_critical = feature_extras.iter().filter(|f| self.critical.contains(*f)).count();

        let business_value_score = business_value_score(
            self.weights,
            covered.len(),
            user.user_count(),
            feature_extras.len(),
            missing_critical,
            subtype_aligned,
            user.synonym_hits.len(),
        );

        let add_on_names: Vec<String> = applied_add_ons.iter().map(|a| a.name.clone()).collect();
        let extras = merge_display_extras(&feature_extras, &add_on_names);
        let ga = user.classified.ga.union(&base.ga).cloned().collect();
        let irrelevant = user
            .classified
            .irrelevant
            .union(&base.irrelevant)
            .cloned()
            .collect();

        CandidateAnalysis {
            plan: plan.to_string(),
            covered_features: covered.clone(),
            extras,
            feature_extras: feature_extras.clone(),
            applied_add_ons,
            bloat_score: bloat.len(),
            bloat_costly_count: bloat_costly.len(),
            rejected: !bloat_costly.is_empty(),
            bloat_features: bloat,
            bloat_costly,
            bloat_weighted,
            extras_count: feature_extras.len(),
            coverage_count: covered.len(),
            business_value_score,
            subtype_aligned,
            missing_critical,
            ga_features: ga,
            irrelevant_features: irrelevant,
            plan_features: plan_normal.into_iter().collect(),
            account_features: user_normal.iter().cloned().collect(),
            missing_features: feature_extras,
        }
    }
}

/// Weighted business value, clamped to [-100, 100]. No features scores 0.
pub fn business_value_score(
    weights: &ScoringWeights,
    coverage_count: usize,
    user_count: usize,
    extras_count: usize,
    missing_critical: usize,
    subtype_aligned: bool,
    synonym_hits: usize,
) -> f64 {
    if user_count == 0 {
        return 0.0;
    }
    let ratio = coverage_count as f64 / user_count as f64;
    let mut score = weights.coverage * ratio;
    if subtype_aligned {
        score += weights.alignment;
    }
    score -= weights.extra_penalty * extras_count as f64;
    score -= weights.missing_critical_penalty * missing_critical as f64;
    score -= weights.synonym_penalty * synonym_hits as f64;
    score.clamp(-100.0, 100.0)
}

/// Feature extras first, then add-on names, deduplicated case-insensitively
pub fn merge_display_extras(feature_extras: &[String], add_on_names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in feature_extras.iter().chain(add_on_names.iter()) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

pub fn is_costly(feature: &str, cost_set: &HashSet<String>) -> bool {
    cost_set.contains(&feature.trim().to_lowercase())
}

/// `(plan ∪ extras) − user`, with its costly subset. No GA/Irrelevant filtering.
pub fn compute_bloat_stats(
    plan_features: &BTreeSet<String>,
    extras: &BTreeSet<String>,
    user: &BTreeSet<String>,
    cost_set: &HashSet<String>,
) -> BloatStats {
    let bloat_features: Vec<String> = plan_features
        .union(extras)
        .filter(|f| !user.contains(*f))
        .cloned()
        .collect();
    let bloat_costly: Vec<String> = bloat_features
        .iter()
        .filter(|f| is_costly(f, cost_set))
        .cloned()
        .collect();
    BloatStats {
        bloat_score: bloat_features.len(),
        bloat_costly_count: bloat_costly.len(),
        bloat_features,
        bloat_costly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sources::PlanSource;
    use std::collections::BTreeMap;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    struct Fixture {
        catalog: PlanCatalog,
        canon: Canonicalizer,
        classifier: FeatureClassifier,
        subtypes: SubtypeFilter,
        cost_set: HashSet<String>,
        critical: BTreeSet<String>,
        weights: ScoringWeights,
    }

    impl Fixture {
        fn new(source: PlanSource) -> Self {
            let mut syn = BTreeMap::new();
            syn.insert("Port Control".to_string(), "portStateControl".to_string());
            let canon = Canonicalizer::new(&syn);
            Self {
                catalog: PlanCatalog::from_source(&source, &canon),
                canon,
                classifier: FeatureClassifier::new(set(&["mapView"]), set(&["betaOptIn"])),
                subtypes: SubtypeFilter::new(EngineConfig::default().subtype_keywords),
                cost_set: ["ubodata".to_string()].into_iter().collect(),
                critical: set(&["sanctions"]),
                weights: ScoringWeights::default(),
            }
        }

        fn evaluator(&self) -> CandidateEvaluator<'_> {
            CandidateEvaluator {
                catalog: &self.catalog,
                classifier: &self.classifier,
                subtypes: &self.subtypes,
                cost_set: &self.cost_set,
                critical: &self.critical,
                weights: &self.weights,
                cost_bloat_weight: 100,
            }
        }

        fn user(&self, raw: &[&str]) -> UserProfile {
            UserProfile::build(raw, &self.canon, &self.classifier)
        }
    }

    #[test]
    fn test_set_math_on_normal_bucket() {
        let fx = Fixture::new(
            PlanSource::new().with_plan("Bunkering Core", &["portStateControl", "mapView", "betaOptIn", "x"]),
        );
        let user = fx.user(&["Port Control", "mapView", "betaOptIn", "y"]);
        let a = fx.evaluator().evaluate("Bunkering Core", &user, Some("Bunkering"));

        assert_eq!(a.covered_features, vec!["portStateControl"]);
        assert_eq!(a.feature_extras, vec!["y"]);
        assert_eq!(a.bloat_features, vec!["x"]);
        assert_eq!(a.ga_features, vec!["mapView"]);
        assert_eq!(a.irrelevant_features, vec!["betaOptIn"]);
        assert!(a.subtype_aligned);
        assert!(!a.rejected);
        assert_eq!(a.bloat_weighted, 1);
        // 30 * 1/4 + 10 - 2 - 5 (one synonym hit)
        assert!((a.business_value_score - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_costly_bloat_rejects() {
        let fx = Fixture::new(PlanSource::new().with_plan("Bunkering Costly", &["a", "UBOdata"]));
        let user = fx.user(&["a"]);
        let a = fx.evaluator().evaluate("Bunkering Costly", &user, Some("Bunkering"));
        assert!(a.rejected);
        assert_eq!(a.bloat_costly, vec!["UBOdata"]);
        assert_eq!(a.bloat_weighted, 101);
    }

    #[test]
    fn test_add_on_suppresses_individual_extras() {
        let fx = Fixture::new(
            PlanSource::new()
                .with_plan("Bunkering Core", &["a"])
                .with_add_on("Compliance Pack", &["sanctions", "pep", "uboData"]),
        );
        let user = fx.user(&["a", "sanctions", "pep", "z"]);
        let a = fx.evaluator().evaluate("Bunkering Core", &user, Some("Bunkering"));

        assert_eq!(a.feature_extras, vec!["z"]);
        assert_eq!(a.extras, vec!["z", "Compliance Pack"]);
        assert_eq!(a.applied_add_on_names(), vec!["Compliance Pack"]);
        // Only the used subset joins the plan, so unused uboData is not bloat
        assert!(a.bloat_features.is_empty());
        assert!(!a.rejected);
        assert_eq!(a.covered_features, vec!["a", "pep", "sanctions"]);
    }

    #[test]
    fn test_missing_critical_counts_extras() {
        let fx = Fixture::new(PlanSource::new().with_plan("Oil Core", &["a"]));
        let user = fx.user(&["a", "sanctions"]);
        let a = fx.evaluator().evaluate("Oil Core", &user, Some("Bunkering"));
        assert_eq!(a.missing_critical, 1);
        assert!(!a.subtype_aligned);
        // 30 * 1/2 - 2 - 20
        assert!((a.business_value_score + 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_business_value_bounds() {
        let w = ScoringWeights::default();
        assert_eq!(business_value_score(&w, 0, 0, 5, 5, true, 5), 0.0);
        assert_eq!(business_value_score(&w, 0, 1, 50, 5, false, 5), -100.0);
        let heavy = ScoringWeights {
            coverage: 500.0,
            ..ScoringWeights::default()
        };
        assert_eq!(business_value_score(&heavy, 1, 1, 0, 0, true, 0), 100.0);
    }

    #[test]
    fn test_merge_display_extras_dedups_case_insensitively() {
        let merged = merge_display_extras(
            &["Pack".to_string(), "b".to_string()],
            &["pack".to_string(), "Other".to_string()],
        );
        assert_eq!(merged, vec!["Pack", "b", "Other"]);
    }

    #[test]
    fn test_compute_bloat_stats_includes_extras() {
        let cost: HashSet<String> = ["ubodata".to_string()].into_iter().collect();
        let stats = compute_bloat_stats(&set(&["a", "b"]), &set(&["uboData"]), &set(&["a"]), &cost);
        assert_eq!(stats.bloat_features, vec!["b", "uboData"]);
        assert_eq!(stats.bloat_costly, vec!["uboData"]);
        assert_eq!(stats.bloat_score, 2);
        assert_eq!(stats.bloat_costly_count, 1);
    }
}
