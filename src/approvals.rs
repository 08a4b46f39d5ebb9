//! Human approvals store
//!
//! SQLite, one row per account. A later approval for the same account
//! replaces the earlier one. Red-line rejections are refused at the door
//! so they can never be persisted as approvals.

use crate::types::OverrideOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS approvals (
    account TEXT PRIMARY KEY,
    subtype TEXT NOT NULL DEFAULT '',
    final_plan TEXT NOT NULL,
    extras_json TEXT NOT NULL DEFAULT '[]',   -- JSON array of extras
    approved_by TEXT NOT NULL DEFAULT '',
    approved_at TEXT NOT NULL                 -- RFC 3339, UTC
);

CREATE INDEX IF NOT EXISTS idx_approvals_plan ON approvals(final_plan);
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub account: String,
    pub subtype: String,
    pub final_plan: String,
    pub extras: Vec<String>,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

pub struct ApprovalsStore {
    conn: Connection,
}

impl ApprovalsStore {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open approvals database at {:?}", path))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace the approval for `record.account`
    pub fn upsert(&self, record: &ApprovalRecord) -> Result<()> {
        let account = record.account.trim();
        if account.is_empty() {
            anyhow::bail!("Approval needs an account name");
        }
        let extras_json = serde_json::to_string(&record.extras)?;

        self.conn
            .execute(
                "INSERT INTO approvals (account, subtype, final_plan, extras_json, approved_by, approved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(account) DO UPDATE SET
                    subtype = excluded.subtype,
                    final_plan = excluded.final_plan,
                    extras_json = excluded.extras_json,
                    approved_by = excluded.approved_by,
                    approved_at = excluded.approved_at",
                params![
                    account,
                    record.subtype,
                    record.final_plan,
                    extras_json,
                    record.approved_by,
                    record.approved_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("Failed to store approval for '{}'", account))?;

        Ok(())
    }

    /// Persist an approved override. Red-line rejections are an error.
    pub fn record_override(
        &self,
        account: &str,
        subtype: &str,
        outcome: &OverrideOutcome,
        approved_by: &str,
    ) -> Result<ApprovalRecord> {
        let approved = match outcome {
            OverrideOutcome::Approved(a) => a,
            OverrideOutcome::Rejected(r) => anyhow::bail!(
                "Refusing to store override for '{}': {} ({})",
                account,
                r.reason,
                r.paid_bloat.join(", ")
            ),
        };

        let record = ApprovalRecord {
            account: account.trim().to_string(),
            subtype: subtype.trim().to_string(),
            final_plan: approved.final_plan.clone(),
            extras: approved.extras.clone(),
            approved_by: approved_by.trim().to_string(),
            approved_at: Utc::now(),
        };
        self.upsert(&record)?;
        tracing::info!("Approved '{}' for account '{}'", record.final_plan, record.account);
        Ok(record)
    }

    pub fn get(&self, account: &str) -> Result<Option<ApprovalRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT account, subtype, final_plan, extras_json, approved_by, approved_at
                 FROM approvals WHERE account = ?1",
                [account.trim()],
                raw_row,
            )
            .optional()?;

        row.map(into_record).transpose()
    }

    /// Every approval, ordered by account
    pub fn all(&self) -> Result<Vec<ApprovalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT account, subtype, final_plan, extras_json, approved_by, approved_at
             FROM approvals ORDER BY account",
        )?;
        let rows = stmt
            .query_map([], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(into_record).collect()
    }

    pub fn remove(&self, account: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM approvals WHERE account = ?1", [account.trim()])?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM approvals", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

type RawRow = (String, String, String, String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_record(raw: RawRow) -> Result<ApprovalRecord> {
    let (account, subtype, final_plan, extras_json, approved_by, approved_at) = raw;
    let extras: Vec<String> = serde_json::from_str(&extras_json)
        .with_context(|| format!("Corrupt extras for '{}'", account))?;
    let approved_at = DateTime::parse_from_rfc3339(&approved_at)
        .with_context(|| format!("Corrupt approval time for '{}'", account))?
        .with_timezone(&Utc);

    Ok(ApprovalRecord {
        account,
        subtype,
        final_plan,
        extras,
        approved_by,
        approved_at,
    })
}
