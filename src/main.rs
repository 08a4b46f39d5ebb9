//! planfit CLI
//!
//! Plan migration advisor: recommend plans for accounts, validate reviewer
//! overrides and keep the approvals ledger.
//!
//! Run with: cargo run -- recommend --plans plans.json --accounts accounts.csv

use anyhow::{Context, Result};
use planfit::{
    approvals::ApprovalsStore,
    batch::recommend_batch,
    config::{get_data_dir, EngineConfig},
    engine::MigrationEngine,
    export,
    review::{ga_visibility, review_recommendation},
    sources::{load_accounts, parse_feature_str, PlanSource},
    types::*,
};
use std::path::{Path, PathBuf};

const USAGE: &str = "Usage:
  planfit recommend --plans <json|csv> --accounts <json|csv> [--config <json>] [--weight N] [--json] [--out <csv>]
  planfit override --plans <file> --plan <name> --features a,b [--extras a,b] [--config <json>]
                   [--approve --account <name> --subtype <s> --by <who> [--db <path>]]
  planfit approvals [--db <path>]
  planfit ga --plans <file> --accounts <file> [--config <json>]
  planfit config [--config <json>]";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("recommend") => run_recommend(&args[2..]),
        Some("override") => run_override(&args[2..]),
        Some("approvals") => run_approvals(&args[2..]),
        Some("ga") => run_ga(&args[2..]),
        Some("config") => {
            let config = load_config(&args[2..])?;
            println!("{}", config.to_json()?);
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

/// Value of `--name value` or `--name=value`
fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    for (i, arg) in args.iter().enumerate() {
        if arg == name {
            return args.get(i + 1).map(|s| s.as_str());
        }
        if let Some(v) = arg.strip_prefix(&prefix) {
            return Some(v);
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn require<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    flag_value(args, name).with_context(|| format!("Missing required {} argument\n\n{}", name, USAGE))
}

fn list_flag(args: &[String], name: &str) -> Vec<String> {
    flag_value(args, name).map(parse_feature_str).unwrap_or_default()
}

fn load_config(args: &[String]) -> Result<EngineConfig> {
    let config = EngineConfig::load(flag_value(args, "--config").map(Path::new))?;
    match flag_value(args, "--weight") {
        Some(w) => {
            let weight: u32 = w
                .parse()
                .with_context(|| format!("Invalid --weight value '{}'", w))?;
            Ok(config.with_cost_bloat_weight(weight))
        }
        None => Ok(config),
    }
}

fn load_engine(args: &[String]) -> Result<MigrationEngine> {
    let plans_path = require(args, "--plans")?;
    let source = PlanSource::from_path(Path::new(plans_path))?;
    if source.plans.is_empty() {
        tracing::warn!("No plans found in {}", plans_path);
    }
    Ok(MigrationEngine::new(&source, load_config(args)?))
}

fn db_path(args: &[String]) -> PathBuf {
    flag_value(args, "--db")
        .map(PathBuf::from)
        .unwrap_or_else(|| get_data_dir().join("approvals.db"))
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_recommend(args: &[String]) -> Result<()> {
    let engine = load_engine(args)?;
    let accounts = load_accounts(Path::new(require(args, "--accounts")?))?;
    let report = recommend_batch(&engine, &accounts);

    if let Some(out) = flag_value(args, "--out") {
        let file = std::fs::File::create(out).with_context(|| format!("Failed to create {}", out))?;
        export::write_batch_csv(file, &report)?;
        tracing::info!("Wrote {} rows to {}", report.results.len(), out);
    }

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Run {} (catalog {})", report.run_id, &report.catalog_fingerprint[..12]);
    println!("========================================");
    for (row, result) in accounts.iter().zip(&report.results) {
        let rec = &result.recommendation;
        println!(
            "{} [{}] → {} ({})",
            if result.account.is_empty() { "<unnamed>" } else { result.account.as_str() },
            result.subtype.as_deref().unwrap_or("Unknown"),
            rec.recommended_plan(),
            rec.status()
        );

        match rec {
            Recommendation::Success(plan) => {
                let review = review_recommendation(
                    &engine,
                    row.subtype.as_deref(),
                    &row.features,
                    &plan.recommended_plan,
                    &plan.extras,
                    &plan.bloat_features,
                );
                println!("  extras: {}", display_list(&plan.extras));
                println!("  bloat:  {}", display_list(&plan.bloat_features));
                println!(
                    "  confidence: {:.1}{}",
                    plan.migration_confidence,
                    if plan.ambiguous_mapping { " (ambiguous)" } else { "" }
                );
                if !plan.unrecognized_features.is_empty() {
                    println!("  unrecognized: {}", display_list(&plan.unrecognized_features));
                }
                println!("  review: {:?}", review.classification);
                for note in &review.notes {
                    println!("    - {}", note);
                }
            }
            Recommendation::NoMatchingPlans(u) | Recommendation::NoValidPlans(u) => {
                println!("  reason: {}", u.reason);
            }
        }
    }

    let s = &report.summary;
    println!("========================================");
    println!(
        "{} accounts: {} success, {} no matching plans, {} no valid plans, {} ambiguous",
        s.total, s.success, s.no_matching_plans, s.no_valid_plans, s.ambiguous
    );
    println!("Mean confidence: {:.1}", s.mean_confidence);
    Ok(())
}

fn run_override(args: &[String]) -> Result<()> {
    let engine = load_engine(args)?;
    let plan = require(args, "--plan")?;
    let features = list_flag(args, "--features");
    let extras = list_flag(args, "--extras");

    let outcome = engine.apply_human_override(plan, &extras, &features);
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if has_flag(args, "--approve") {
        let store = ApprovalsStore::open(&db_path(args))?;
        let record = store.record_override(
            require(args, "--account")?,
            flag_value(args, "--subtype").unwrap_or(""),
            &outcome,
            flag_value(args, "--by").unwrap_or(""),
        )?;
        println!("Stored approval for '{}' at {}", record.account, record.approved_at);
    }

    Ok(())
}

fn run_approvals(args: &[String]) -> Result<()> {
    let store = ApprovalsStore::open(&db_path(args))?;
    let records = store.all()?;
    if records.is_empty() {
        println!("No approvals recorded.");
        return Ok(());
    }
    for r in records {
        println!(
            "{} [{}] → {} + {} (by {} at {})",
            r.account,
            r.subtype,
            r.final_plan,
            display_list(&r.extras),
            if r.approved_by.is_empty() { "unknown" } else { r.approved_by.as_str() },
            r.approved_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn run_ga(args: &[String]) -> Result<()> {
    let engine = load_engine(args)?;
    let accounts = load_accounts(Path::new(require(args, "--accounts")?))?;
    let rows: Vec<_> = accounts.iter().map(|a| ga_visibility(a, &engine)).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
