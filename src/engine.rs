//! Migration engine: ranking, selection and human overrides
//!
//! Flow for one account:
//! 1. Canonicalize and classify the account's raw features
//! 2. Restrict candidates to the subtype's plan family
//! 3. Evaluate every candidate, drop any with costly bloat
//! 4. Stable sort by (extras ↑, weighted bloat ↑, coverage ↓, business value ↓)
//! 5. Attach diagnostics: ambiguity, unrecognized features, confidence
//!
//! The engine owns its configuration and catalog and never mutates them after
//! construction, so one instance can serve many threads.

use crate::canonical::Canonicalizer;
use crate::catalog::PlanCatalog;
use crate::classify::{Classified, FeatureClassifier};
use crate::config::EngineConfig;
use crate::evaluate::{self, CandidateEvaluator, UserProfile};
use crate::sources::PlanSource;
use crate::subtype::SubtypeFilter;
use crate::types::{
    AccountRow, ApprovedOverride, BloatStats, CandidateAnalysis, OverrideOutcome, Recommendation,
    RecommendedPlan, RedLineRejection, Unresolved,
};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

pub const PAID_BLOAT_REASON: &str = "Override introduces paid bloat";
pub const ALL_REJECTED_REASON: &str = "All candidates rejected due to paid bloat";

pub struct MigrationEngine {
    config: EngineConfig,
    canon: Canonicalizer,
    catalog: PlanCatalog,
    classifier: FeatureClassifier,
    subtypes: SubtypeFilter,
    cost_set: HashSet<String>,
    critical: BTreeSet<String>,
    cost_bloat_weight: u32,
}

impl MigrationEngine {
    pub fn new(source: &PlanSource, config: EngineConfig) -> Self {
        let known = source
            .plans
            .iter()
            .chain(source.add_ons.iter())
            .flat_map(|(_, features)| features.iter())
            .chain(config.ga_features.iter())
            .chain(config.irrelevant_features.iter())
            .chain(config.costly_features.iter())
            .chain(config.critical_features.iter());
        let canon = Canonicalizer::new(&config.synonyms).with_known_features(known);

        let catalog = PlanCatalog::from_source(source, &canon);
        let classifier = FeatureClassifier::new(
            canon.canonicalize_all(&config.ga_features).into_iter().collect(),
            canon.canonicalize_all(&config.irrelevant_features).into_iter().collect(),
        );
        let subtypes = SubtypeFilter::new(config.subtype_keywords.clone());

        let mut cost_set = HashSet::new();
        for feature in &config.costly_features {
            let raw = feature.trim().to_lowercase();
            if raw.is_empty() {
                continue;
            }
            cost_set.insert(raw);
            cost_set.insert(canon.canonicalize(feature).to_lowercase());
        }
        let critical = canon.canonicalize_all(&config.critical_features).into_iter().collect();

        info!(
            "Loaded {} plans, {} add-ons, {} known features",
            catalog.len(),
            catalog.add_on_plans().len(),
            canon.alias_count()
        );

        let cost_bloat_weight = config.cost_bloat_weight;
        Self {
            config,
            canon,
            catalog,
            classifier,
            subtypes,
            cost_set,
            critical,
            cost_bloat_weight,
        }
    }

    /// Override the costly-bloat penalty for this engine only
    pub fn with_cost_bloat_weight(mut self, weight: u32) -> Self {
        self.cost_bloat_weight = weight;
        self.config.cost_bloat_weight = weight;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canon
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &FeatureClassifier {
        &self.classifier
    }

    pub fn subtypes(&self) -> &SubtypeFilter {
        &self.subtypes
    }

    pub fn cost_bloat_weight(&self) -> u32 {
        self.cost_bloat_weight
    }

    pub fn is_costly(&self, feature: &str) -> bool {
        evaluate::is_costly(feature, &self.cost_set)
    }

    pub fn get_relevant_plans(&self, subtype: Option<&str>) -> Vec<String> {
        self.subtypes.relevant_plans(subtype, &self.catalog)
    }

    /// Canonicalize then classify raw feature names
    pub fn classify_features<S: AsRef<str>>(&self, raw: &[S]) -> Classified {
        let canonical = self.canon.canonicalize_all(raw.iter().map(|f| f.as_ref()));
        self.classifier.classify(canonical)
    }

    pub fn user_profile<S: AsRef<str>>(&self, raw: &[S]) -> UserProfile {
        UserProfile::build(raw, &self.canon, &self.classifier)
    }

    fn evaluator(&self) -> CandidateEvaluator<'_> {
        CandidateEvaluator {
            catalog: &self.catalog,
            classifier: &self.classifier,
            subtypes: &self.subtypes,
            cost_set: &self.cost_set,
            critical: &self.critical,
            weights: &self.config.scoring,
            cost_bloat_weight: self.cost_bloat_weight,
        }
    }

    // ========================================================================
    // RECOMMENDATION
    // ========================================================================

    pub fn recommend(&self, row: &AccountRow) -> Recommendation {
        let subtype = row
            .subtype
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let user = self.user_profile(&row.features);
        let unrecognized = self.unrecognized_features(&user);

        let candidates = self.get_relevant_plans(subtype);
        if candidates.is_empty() {
            debug!(
                "No candidate plans for account '{}' (subtype {:?})",
                row.display_name(),
                subtype
            );
            return Recommendation::NoMatchingPlans(Unresolved::new(
                format!("No plans found for subtype '{}'", subtype.unwrap_or("Unknown")),
                unrecognized,
                Vec::new(),
            ));
        }

        let evaluator = self.evaluator();
        let analyses: Vec<CandidateAnalysis> = candidates
            .iter()
            .map(|plan| evaluator.evaluate(plan, &user, subtype))
            .collect();

        for rejected in analyses.iter().filter(|a| a.rejected) {
            debug!(
                "Rejected '{}' for account '{}': costly bloat {:?}",
                rejected.plan,
                row.display_name(),
                rejected.bloat_costly
            );
        }

        let mut valid: Vec<CandidateAnalysis> =
            analyses.iter().filter(|a| a.is_valid()).cloned().collect();
        if valid.is_empty() {
            return Recommendation::NoValidPlans(Unresolved::new(
                ALL_REJECTED_REASON.to_string(),
                unrecognized,
                analyses,
            ));
        }

        // Vec::sort_by is stable: ties keep catalog order
        valid.sort_by(rank_candidates);
        let winner = valid[0].clone();

        let ambiguous_mapping = self.is_ambiguous(&user.canonical);
        let migration_confidence = self.migration_confidence(&winner, &user, ambiguous_mapping);
        let why = format!(
            "GA Features in this plan: {}",
            if winner.ga_features.is_empty() {
                "None".to_string()
            } else {
                winner.ga_features.join(", ")
            }
        );

        debug!(
            "Recommended '{}' for account '{}' ({} extras, confidence {:.1})",
            winner.plan,
            row.display_name(),
            winner.extras_count,
            migration_confidence
        );

        Recommendation::Success(RecommendedPlan {
            recommended_plan: winner.plan,
            covered_features: winner.covered_features,
            extras: winner.extras,
            feature_extras: winner.feature_extras,
            applied_add_ons: winner.applied_add_ons,
            bloat_features: winner.bloat_features,
            bloat_score: winner.bloat_score,
            bloat_costly: winner.bloat_costly,
            bloat_costly_count: winner.bloat_costly_count,
            bloat_weighted: winner.bloat_weighted,
            extras_count: winner.extras_count,
            coverage_count: winner.coverage_count,
            business_value_score: winner.business_value_score,
            ambiguous_mapping,
            unrecognized_features: unrecognized,
            migration_confidence,
            ga_features: winner.ga_features,
            irrelevant_features: winner.irrelevant_features,
            plan_features: winner.plan_features,
            account_features: winner.account_features,
            missing_features: winner.missing_features,
            why,
            all_candidates: valid,
            all_plans: analyses,
        })
    }

    /// True when the account's features show up in plans of more than one family.
    ///
    /// Every canonical feature counts, GA and Irrelevant included, so a shared
    /// GA feature can flag an otherwise clean account.
    fn is_ambiguous(&self, user_features: &BTreeSet<String>) -> bool {
        let mut families = BTreeSet::new();
        for plan in self.catalog.plan_definitions() {
            if user_features.iter().any(|f| plan.contains(f)) {
                families.extend(self.subtypes.families_in_plan_name(&plan.name));
                if families.len() > 1 {
                    return true;
                }
            }
        }
        false
    }

    /// Canonical account features found in no plan and no add-on
    fn unrecognized_features(&self, user: &UserProfile) -> Vec<String> {
        let known = self.catalog.all_known_features();
        user.canonical
            .iter()
            .filter(|f| !known.contains(*f))
            .cloned()
            .collect()
    }

    fn migration_confidence(
        &self,
        winner: &CandidateAnalysis,
        user: &UserProfile,
        ambiguous: bool,
    ) -> f64 {
        let w = &self.config.scoring;
        let ratio = winner.coverage_count as f64 / user.user_count().max(1) as f64;
        let mut score = w.coverage * ratio;
        if !ambiguous {
            score += w.alignment;
        }
        score -= w.extra_penalty * winner.extras_count as f64;
        score -= w.synonym_penalty * user.synonym_hits.len() as f64;
        score.clamp(0.0, 100.0)
    }

    // ========================================================================
    // HUMAN OVERRIDE
    // ========================================================================

    /// Validate a reviewer's plan choice against the red line.
    ///
    /// Extras may name add-on bundles; a bundle contributes only the features
    /// the account actually uses.
    pub fn apply_human_override<S1, S2>(
        &self,
        plan: &str,
        extras: &[S1],
        user_features: &[S2],
    ) -> OverrideOutcome
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let user = self.user_profile(user_features);

        let (final_plan, base_features) = match self.catalog.plan(plan) {
            Some(def) => (def.name.clone(), def.features.clone()),
            None => {
                warn!("Override names unknown plan '{}', treating it as empty", plan.trim());
                (plan.trim().to_string(), BTreeSet::new())
            }
        };

        let extras_set = self.expand_extras(extras, &user);
        let base = self.classifier.classify(&base_features);
        let added = self.classifier.classify(&extras_set);

        let effective: BTreeSet<String> = base.normal.union(&added.normal).cloned().collect();
        let bloat: Vec<String> = effective.difference(user.normal()).cloned().collect();
        let paid_bloat: Vec<String> = bloat.iter().filter(|f| self.is_costly(f)).cloned().collect();

        if !paid_bloat.is_empty() {
            debug!("Override to '{}' rejected: paid bloat {:?}", final_plan, paid_bloat);
            return OverrideOutcome::Rejected(RedLineRejection {
                reason: PAID_BLOAT_REASON.to_string(),
                paid_bloat,
            });
        }

        let covered = user.normal().intersection(&base.normal).cloned().collect();
        let ga = user.classified.ga.iter().chain(&base.ga).chain(&added.ga).cloned();
        let irrelevant = user
            .classified
            .irrelevant
            .iter()
            .chain(&base.irrelevant)
            .chain(&added.irrelevant)
            .cloned();

        OverrideOutcome::Approved(ApprovedOverride {
            final_plan,
            extras: self.display_override_extras(extras),
            covered_features: covered,
            bloat_score: bloat.len(),
            bloat_features: bloat,
            bloat_costly: Vec::new(),
            bloat_costly_count: 0,
            ga_features: ga.collect::<BTreeSet<_>>().into_iter().collect(),
            irrelevant_features: irrelevant.collect::<BTreeSet<_>>().into_iter().collect(),
        })
    }

    /// Canonical extras with add-on names replaced by their used features
    fn expand_extras<S: AsRef<str>>(&self, extras: &[S], user: &UserProfile) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for extra in extras {
            let raw = extra.as_ref();
            if let Some(bundle) = self.catalog.add_on(raw) {
                out.extend(bundle.features.intersection(&user.canonical).cloned());
                continue;
            }
            let canonical = self.canon.canonicalize(raw);
            if !canonical.is_empty() {
                out.insert(canonical);
            }
        }
        out
    }

    /// Normal canonical feature extras in sorted order, then add-on names as
    /// the catalog spells them
    fn display_override_extras<S: AsRef<str>>(&self, extras: &[S]) -> Vec<String> {
        let mut add_on_names = Vec::new();
        let mut features = BTreeSet::new();
        for extra in extras {
            let raw = extra.as_ref();
            match self.catalog.add_on(raw) {
                Some(bundle) => add_on_names.push(bundle.name.clone()),
                None => {
                    let canonical = self.canon.canonicalize(raw);
                    if !canonical.is_empty() {
                        features.insert(canonical);
                    }
                }
            }
        }
        let normal: Vec<String> = self.classifier.classify(&features).normal.into_iter().collect();
        evaluate::merge_display_extras(&normal, &add_on_names)
    }

    /// `(plan ∪ extras) − user` on canonical names, with no classification
    pub fn compute_bloat_stats<S1, S2>(&self, plan: &str, extras: &[S1], user_features: &[S2]) -> BloatStats
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let plan_features = self
            .catalog
            .plan(plan)
            .map(|p| p.features.clone())
            .unwrap_or_default();
        let extras: BTreeSet<String> = self
            .canon
            .canonicalize_all(extras.iter().map(|e| e.as_ref()))
            .into_iter()
            .collect();
        let user: BTreeSet<String> = self
            .canon
            .canonicalize_all(user_features.iter().map(|f| f.as_ref()))
            .into_iter()
            .collect();
        evaluate::compute_bloat_stats(&plan_features, &extras, &user, &self.cost_set)
    }
}

/// Ranking key: fewer extras, then less weighted bloat, then more coverage,
/// then higher business value
fn rank_candidates(a: &CandidateAnalysis, b: &CandidateAnalysis) -> Ordering {
    a.extras_count
        .cmp(&b.extras_count)
        .then(a.bloat_weighted.cmp(&b.bloat_weighted))
        .then(b.coverage_count.cmp(&a.coverage_count))
        .then(b.business_value_score.total_cmp(&a.business_value_score))
}
