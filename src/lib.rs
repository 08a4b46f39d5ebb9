//! planfit - Plan Migration Advisor
//!
//! Recommends a subscription plan for each customer account during a
//! product migration, based on the feature flags the account uses today.
//!
//! # Vocabulary
//!
//! - **Extras**: features the account uses that the plan lacks, added one by one
//! - **Bloat**: features the plan grants that the account does not use
//! - **Costly bloat**: bloat that is expensive to give away; never granted for free
//! - **GA / Irrelevant**: features excluded from extras and bloat accounting
//! - **Add-on**: a named bundle that can sit on top of any base plan
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use planfit::{EngineConfig, MigrationEngine, PlanSource, AccountRow};
//!
//! let plans = PlanSource::from_path(&plans_path)?;
//! let engine = MigrationEngine::new(&plans, EngineConfig::load(None)?);
//!
//! let rec = engine.recommend(&AccountRow::new("Bunkering", &["Port Control"]));
//! println!("{} ({})", rec.recommended_plan(), rec.status());
//!
//! // A reviewer picks something else: validate against the red line
//! let outcome = engine.apply_human_override("Bunkering Base", &["uboData"], &["Port Control"]);
//! ```
//!
//! # Architecture
//!
//! ```text
//! plan file / matrix ─► sources ─► catalog ─┐
//! config ──────────────► canonical, classify ├─► engine ─► Recommendation
//! account rows ────────► sources ────────────┘       │
//!                                                    ├─► review, batch, export
//!                                                    └─► approvals (SQLite)
//! ```

pub mod approvals;
pub mod batch;
pub mod canonical;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod engine;
pub mod evaluate;
pub mod export;
pub mod review;
pub mod sources;
pub mod subtype;
pub mod types;

// Core engine
pub use engine::MigrationEngine;
pub use config::{get_data_dir, EngineConfig, ScoringWeights, SubtypeKeyword};
pub use types::*;

// Building blocks
pub use canonical::{canonicalize, clean_feature_name, Canonicalizer};
pub use catalog::{AddOnBundle, PlanCatalog, PlanDefinition};
pub use classify::{Classified, FeatureClassifier};
pub use evaluate::{CandidateEvaluator, UserProfile};
pub use subtype::SubtypeFilter;

// Adapters
pub use sources::{load_accounts, parse_feature_list, PlanSource};

// Around the core
pub use approvals::{ApprovalRecord, ApprovalsStore};
pub use batch::{catalog_fingerprint, recommend_batch, BatchReport, BatchSummary};
pub use review::{ga_visibility, reorder_features, review_recommendation, GaVisibility, ReviewSummary};
