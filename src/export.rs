//! CSV export of batch results and plan matrices

use crate::batch::BatchReport;
use crate::catalog::PlanCatalog;
use anyhow::{Context, Result};
use std::io::Write;

pub const BATCH_HEADERS: &[&str] = &[
    "Account",
    "Sub Type",
    "Status",
    "Recommended Plan",
    "Extras",
    "Bloat",
    "Costly Bloat",
    "Confidence",
    "Ambiguous",
    "Unrecognized",
    "Reason",
];

/// One row per account, list cells joined with ", "
pub fn write_batch_csv<W: Write>(writer: W, report: &BatchReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(BATCH_HEADERS)?;

    for r in &report.results {
        let rec = &r.recommendation;
        wtr.write_record([
            r.account.clone(),
            r.subtype.clone().unwrap_or_default(),
            rec.status().to_string(),
            rec.recommended_plan().to_string(),
            rec.extras().join(", "),
            rec.bloat_features().join(", "),
            rec.bloat_costly().join(", "),
            format!("{:.1}", rec.migration_confidence()),
            rec.ambiguous_mapping().to_string(),
            rec.unrecognized_features().join(", "),
            rec.reason().unwrap_or_default().to_string(),
        ])
        .with_context(|| format!("Failed to write row for '{}'", r.account))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Long `Plan,Feature,Add-On` matrix, readable by `PlanSource::from_matrix`.
/// Add-on bundles follow the plans with `yes` in the marker column.
pub fn write_plan_matrix_csv<W: Write>(writer: W, catalog: &PlanCatalog) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Plan", "Feature", "Add-On"])?;
    let rows = catalog
        .plan_definitions()
        .iter()
        .map(|p| (p, ""))
        .chain(catalog.add_on_plans().iter().map(|a| (a, "yes")));
    for (def, marker) in rows {
        for feature in &def.features {
            wtr.write_record([def.name.as_str(), feature.as_str(), marker])?;
        }
    }
    wtr.flush()?;
    Ok(())
}
