//! Batch recommendation runs
//!
//! Accounts are evaluated independently and results keep input order.
//! Every report carries a run id, a timestamp and a fingerprint of the
//! catalog and configuration, so an exported sheet can be traced back to
//! the exact inputs that produced it.

use crate::catalog::PlanCatalog;
use crate::config::EngineConfig;
use crate::engine::MigrationEngine;
use crate::types::{AccountRow, Recommendation, RecommendationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecommendation {
    pub account: String,
    pub subtype: Option<String>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub no_matching_plans: usize,
    pub no_valid_plans: usize,
    pub ambiguous: usize,
    /// Mean over successful recommendations only
    pub mean_confidence: f64,
    /// Recommended plan → number of accounts
    pub plan_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub catalog_fingerprint: String,
    pub results: Vec<AccountRecommendation>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &AccountRecommendation> {
        self.results.iter().filter(|r| r.recommendation.is_success())
    }
}

pub fn recommend_batch(engine: &MigrationEngine, rows: &[AccountRow]) -> BatchReport {
    let results: Vec<AccountRecommendation> = rows
        .iter()
        .map(|row| AccountRecommendation {
            account: row.display_name().to_string(),
            subtype: row.subtype.clone(),
            recommendation: engine.recommend(row),
        })
        .collect();

    let summary = summarize(&results);
    tracing::info!(
        "Batch complete: {} accounts, {} success, {} no matching plans, {} no valid plans",
        summary.total,
        summary.success,
        summary.no_matching_plans,
        summary.no_valid_plans
    );

    BatchReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        catalog_fingerprint: catalog_fingerprint(engine.catalog(), engine.config()),
        results,
        summary,
    }
}

fn summarize(results: &[AccountRecommendation]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: results.len(),
        ..BatchSummary::default()
    };
    let mut confidence_sum = 0.0;

    for r in results {
        match r.recommendation.status() {
            RecommendationStatus::Success => {
                summary.success += 1;
                confidence_sum += r.recommendation.migration_confidence();
                *summary
                    .plan_counts
                    .entry(r.recommendation.recommended_plan().to_string())
                    .or_insert(0) += 1;
            }
            RecommendationStatus::NoMatchingPlans => summary.no_matching_plans += 1,
            RecommendationStatus::NoValidPlans => summary.no_valid_plans += 1,
            _ => {}
        }
        if r.recommendation.ambiguous_mapping() {
            summary.ambiguous += 1;
        }
    }

    if summary.success > 0 {
        summary.mean_confidence = confidence_sum / summary.success as f64;
    }
    summary
}

/// SHA-256 over the canonical catalog and the engine configuration
pub fn catalog_fingerprint(catalog: &PlanCatalog, config: &EngineConfig) -> String {
    let mut hasher = Sha256::new();

    for (tag, defs) in [("plan", catalog.plan_definitions()), ("add_on", catalog.add_on_plans())] {
        for def in defs {
            hasher.update(tag.as_bytes());
            hasher.update([0u8]);
            hasher.update(def.name.as_bytes());
            for feature in &def.features {
                hasher.update([0u8]);
                hasher.update(feature.as_bytes());
            }
            hasher.update([b'\n']);
        }
    }

    // Config is plain data with ordered maps, serialization cannot fail
    let config_bytes = serde_json::to_vec(config).unwrap_or_default();
    hasher.update(&config_bytes);

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PlanSource;

    fn source() -> PlanSource {
        PlanSource::new()
            .with_plan("Bunkering Core", &["portStateControl"])
            .with_plan("Bunkering Costly", &["portStateControl", "uboData"])
            .with_plan("Shipowners Fleet", &["portStateControl", "fleetView"])
    }

    #[test]
    fn test_batch_keeps_order_and_counts() {
        let engine = MigrationEngine::new(&source(), EngineConfig::default());
        let rows = vec![
            AccountRow::new("Bunkering", &["Port Control"]).with_name("A"),
            AccountRow::new("Port Authority", &["x"]).with_name("B"),
            AccountRow::new("Shipowner", &["fleetView", "portStateControl"]).with_name("C"),
        ];
        let report = recommend_batch(&engine, &rows);

        let names: Vec<&str> = report.results.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.success, 2);
        assert_eq!(report.summary.no_matching_plans, 1);
        assert_eq!(report.summary.plan_counts.get("Bunkering Core"), Some(&1));
        assert_eq!(report.successes().count(), 2);
        assert_eq!(report.catalog_fingerprint.len(), 64);
        assert!(report.summary.mean_confidence > 0.0);
    }

    #[test]
    fn test_empty_batch() {
        let engine = MigrationEngine::new(&source(), EngineConfig::default());
        let report = recommend_batch(&engine, &[]);
        assert_eq!(report.summary, BatchSummary::default());
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let config = EngineConfig::default();
        let a = MigrationEngine::new(&source(), config.clone());
        let b = MigrationEngine::new(&source(), config.clone());
        assert_eq!(
            catalog_fingerprint(a.catalog(), a.config()),
            catalog_fingerprint(b.catalog(), b.config())
        );

        let changed = MigrationEngine::new(&source().with_plan("Oil Core", &["a"]), config.clone());
        assert_ne!(
            catalog_fingerprint(a.catalog(), a.config()),
            catalog_fingerprint(changed.catalog(), changed.config())
        );

        let reweighted = MigrationEngine::new(&source(), config).with_cost_bloat_weight(1);
        assert_ne!(
            catalog_fingerprint(a.catalog(), a.config()),
            catalog_fingerprint(reweighted.catalog(), reweighted.config())
        );
    }
}
