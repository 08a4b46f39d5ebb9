//! Import legacy plan/feature matrices into plan JSON
//!
//! Usage: cargo run --bin import -- <csv-or-dir>... [--out plans.json]
//!
//! Directories are walked for `.csv` files. Every matrix is parsed with the
//! same column heuristics the engine uses; plans found in several files
//! merge their features.

use anyhow::{Context, Result};
use planfit::sources::PlanSource;
use std::fs;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();

    let mut out: Option<PathBuf> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--out" {
            out = iter.next().map(PathBuf::from);
        } else if let Some(path) = arg.strip_prefix("--out=") {
            out = Some(PathBuf::from(path));
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }

    if inputs.is_empty() {
        eprintln!("Usage: {} <csv-or-dir>... [--out plans.json]", args[0]);
        eprintln!("Example: {} exports/plan_matrices --out plans.json", args[0]);
        std::process::exit(1);
    }

    let mut merged = PlanSource::new();
    let mut files = 0;

    for input in &inputs {
        if !input.exists() {
            eprintln!("Warning: {:?} does not exist, skipping", input);
            continue;
        }
        for path in csv_files(input) {
            match import_matrix(&path) {
                Ok(source) => {
                    println!("  {:?}: {} plans", path, source.plans.len());
                    merged.extend(source);
                    files += 1;
                }
                Err(e) => eprintln!("  Error importing {:?}: {:#}", path, e),
            }
        }
    }

    let json = serde_json::to_string_pretty(&merged.to_json_value())?;
    match out {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
            println!("\n========================================");
            println!("Import complete!");
            println!("  Files: {}", files);
            println!("  Plans: {}", merged.plans.len());
            println!("  Output: {:?}", path);
            println!("========================================");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn csv_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| x.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn import_matrix(path: &Path) -> Result<PlanSource> {
    let source = PlanSource::from_csv_path(path)?;
    if source.plans.is_empty() {
        tracing::warn!("No plan/feature columns recognized in {:?}", path);
    }
    Ok(source)
}
