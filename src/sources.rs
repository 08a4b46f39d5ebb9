//! Input adapters that run before the engine
//!
//! Upstream data comes from spreadsheets, CRM exports and hand-edited JSON,
//! so parsing here is deliberately permissive: malformed feature cells turn
//! into "no features" instead of errors. Only file I/O can fail.

use crate::types::AccountRow;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Columns checked, in order, for an account's feature flags
pub const PREFERRED_FEATURE_COLUMNS: &[&str] = &[
    "featureNames",
    "features",
    "Feature Names",
    "Feature Flags",
    "FF",
    "Flags",
    "featureNames_values",
];

const SUBTYPE_COLUMNS: &[&str] = &["Sub Type", "Subtype"];
const NAME_COLUMNS: &[&str] = &["name", "Account", "SalesForce_Account_NAME"];

/// Family key holding add-on bundles in nested plan files
const ADD_ONS_KEYS: &[&str] = &["ADD_ONS", "ADDONS", "ADD-ONS"];
/// Family key ignored when flattening plans
const EXTRAS_KEY: &str = "EXTRAS";

// ============================================================================
// FEATURE LISTS
// ============================================================================

/// Parse a feature cell into raw feature names.
///
/// Accepts a JSON array, a Python-literal list string (`"['a', 'b']"`), a
/// JSON array string, or a comma-separated string. Anything else is empty.
pub fn parse_feature_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_feature).collect(),
        Value::String(s) => parse_feature_str(s),
        _ => Vec::new(),
    }
}

/// String form of `parse_feature_list`
pub fn parse_feature_str(raw: &str) -> Vec<String> {
    let s = raw.trim();
    if s.is_empty() || is_null_token(s) {
        return Vec::new();
    }

    let bracketed = (s.starts_with('[') && s.ends_with(']'))
        || (s.starts_with('(') && s.ends_with(')'));
    if bracketed {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(s) {
            return items.iter().filter_map(scalar_to_feature).collect();
        }
        if let Some(items) = parse_python_list(&s[1..s.len() - 1]) {
            return items;
        }
    }

    if let Some(single) = unquote(s) {
        return if single.trim().is_empty() {
            Vec::new()
        } else {
            vec![single.trim().to_string()]
        };
    }

    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

fn scalar_to_feature(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn is_null_token(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "nan" | "none" | "null")
}

/// Strip matching single or double quotes around the whole string
fn unquote(s: &str) -> Option<&str> {
    if s.len() >= 2 {
        let first = s.as_bytes()[0];
        let last = s.as_bytes()[s.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            let inner = &s[1..s.len() - 1];
            if !inner.contains(first as char) {
                return Some(inner);
            }
        }
    }
    None
}

/// Parse the inside of a Python list literal: quoted items separated by commas.
/// Returns None on unbalanced quotes.
fn parse_python_list(inner: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(&c) = chars.peek() else { break };

        if c == '\'' || c == '"' {
            chars.next();
            let mut item = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        item.push(escaped);
                    }
                } else if ch == c {
                    closed = true;
                    break;
                } else {
                    item.push(ch);
                }
            }
            if !closed {
                return None;
            }
            let trimmed = item.trim();
            if !trimmed.is_empty() {
                items.push(trimmed.to_string());
            }
        } else {
            let mut token = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == ',' {
                    break;
                }
                token.push(ch);
                chars.next();
            }
            let trimmed = token.trim();
            if !trimmed.is_empty() && !is_null_token(trimmed) {
                items.push(trimmed.to_string());
            }
        }
    }

    Some(items)
}

// ============================================================================
// ACCOUNT ROWS
// ============================================================================

impl AccountRow {
    /// Build an account from a loosely shaped JSON row.
    ///
    /// Airtable-style `{"id": .., "fields": {..}}` records are unwrapped.
    pub fn from_json(value: &Value) -> AccountRow {
        let Some(obj) = value.as_object() else {
            return AccountRow::default();
        };
        if let Some(fields) = obj.get("fields").and_then(Value::as_object) {
            return Self::from_fields(fields);
        }
        Self::from_fields(obj)
    }

    fn from_fields(obj: &Map<String, Value>) -> AccountRow {
        AccountRow {
            name: first_text(obj, NAME_COLUMNS),
            subtype: first_text(obj, SUBTYPE_COLUMNS),
            features: extract_user_features(obj),
        }
    }
}

/// Heuristically extract feature flags from a row
pub fn extract_user_features(obj: &Map<String, Value>) -> Vec<String> {
    for col in PREFERRED_FEATURE_COLUMNS {
        if let Some(v) = obj.get(*col) {
            let feats = parse_feature_list(v);
            if !feats.is_empty() {
                return feats;
            }
        }
    }

    for (key, v) in obj {
        let name = key.to_lowercase();
        if name.contains("feature") || name == "ff" {
            let feats = parse_feature_list(v);
            if !feats.is_empty() {
                return feats;
            }
        }
    }

    Vec::new()
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() && !is_null_token(s.trim()) => {
            Some(s.trim().to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Load account rows from a JSON or CSV file.
///
/// JSON may be an array of rows or an object holding `rows` / `records`.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountRow>> {
    if has_extension(path, "csv") {
        let (headers, rows) = read_csv_table(path)?;
        return Ok(rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = headers
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|cell| Value::String(cell.clone())))
                    .collect();
                AccountRow::from_fields(&obj)
            })
            .collect());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {:?}", path))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse accounts file {:?}", path))?;

    let rows = match &value {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => obj
            .get("rows")
            .or_else(|| obj.get("records"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    Ok(rows.iter().map(AccountRow::from_json).collect())
}

// ============================================================================
// PLAN SOURCES
// ============================================================================

/// Raw plan → features and add-on → features mappings, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSource {
    pub plans: Vec<(String, Vec<String>)>,
    pub add_ons: Vec<(String, Vec<String>)>,
}

impl PlanSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan<S: AsRef<str>>(mut self, name: &str, features: &[S]) -> Self {
        push_entry(
            &mut self.plans,
            name,
            features.iter().map(|f| f.as_ref().to_string()),
        );
        self
    }

    pub fn with_add_on<S: AsRef<str>>(mut self, name: &str, features: &[S]) -> Self {
        push_entry(
            &mut self.add_ons,
            name,
            features.iter().map(|f| f.as_ref().to_string()),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty() && self.add_ons.is_empty()
    }

    /// Flat `{plan: [features]}` or nested `{family: {plan: [features]}}`.
    ///
    /// In nested form a family mapped directly to a list is itself a plan,
    /// `ADD_ONS` holds add-on bundles and `EXTRAS` is ignored.
    pub fn from_json_value(value: &Value) -> Self {
        let mut source = PlanSource::default();
        let Some(obj) = value.as_object() else {
            return source;
        };

        for (family, entry) in obj {
            let family_key = family.trim().to_uppercase();
            if family_key == EXTRAS_KEY {
                continue;
            }
            match entry {
                Value::Array(features) => {
                    push_entry(
                        &mut source.plans,
                        family,
                        features.iter().filter_map(scalar_to_feature),
                    );
                }
                Value::Object(plans) => {
                    let target = if ADD_ONS_KEYS.contains(&family_key.as_str()) {
                        &mut source.add_ons
                    } else {
                        &mut source.plans
                    };
                    for (plan, features) in plans {
                        if let Value::Array(features) = features {
                            push_entry(target, plan, features.iter().filter_map(scalar_to_feature));
                        }
                    }
                }
                _ => {}
            }
        }

        source
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Invalid plan JSON")?;
        Ok(Self::from_json_value(&value))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {:?}", path))?;
        Self::from_json_str(&content).with_context(|| format!("Failed to load plans from {:?}", path))
    }

    /// Legacy tabular plan/feature matrix.
    ///
    /// 1. Long format: a `PLAN` column plus one or more `FF`/`FEATURE`
    ///    columns; blank plan cells continue the plan above.
    /// 2. Wide format: one `FF`/`FEATURE` column listing features, every
    ///    other column a plan whose truthy cells mark inclusion.
    /// 3. No recognizable headers: first column plan, second column feature.
    pub fn from_matrix(headers: &[String], rows: &[Vec<String>]) -> Self {
        let upper: Vec<String> = headers.iter().map(|h| h.trim().to_uppercase()).collect();
        let plan_col = upper.iter().position(|h| h.contains("PLAN"));
        let add_on_col = upper.iter().position(|h| is_add_on_header(h));
        let feature_cols: Vec<usize> = upper
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != plan_col && Some(*i) != add_on_col)
            .filter(|(_, h)| h.contains("FF") || h.contains("FEATURE"))
            .map(|(i, _)| i)
            .collect();

        if let Some(plan_col) = plan_col {
            if !feature_cols.is_empty() {
                let source = Self::from_long_matrix(plan_col, &feature_cols, add_on_col, rows);
                if !source.is_empty() {
                    return source;
                }
            }
        }

        if let Some(&ff_col) = feature_cols.first() {
            let source = Self::from_wide_matrix(headers, &upper, ff_col, add_on_col, rows);
            if !source.is_empty() {
                return source;
            }
        }

        if headers.len() >= 2 && plan_col.is_none() && feature_cols.is_empty() {
            return Self::from_long_matrix(0, &[1], None, rows);
        }

        PlanSource::default()
    }

    /// One feature per row; blank plan cells inherit the plan above, and a
    /// truthy add-on marker on the plan's first row makes it an add-on bundle
    fn from_long_matrix(
        plan_col: usize,
        feature_cols: &[usize],
        add_on_col: Option<usize>,
        rows: &[Vec<String>],
    ) -> Self {
        let mut source = PlanSource::default();
        let mut current: Option<(String, bool)> = None;

        for row in rows {
            if let Some(plan) = cell(row, plan_col) {
                let is_add_on = add_on_col.is_some_and(|c| is_truthy(row.get(c).map(String::as_str)));
                current = Some((plan.to_string(), is_add_on));
            }
            let Some((plan, is_add_on)) = current.as_ref() else {
                continue;
            };
            let features = feature_cols.iter().filter_map(|&c| cell(row, c)).map(str::to_string);
            let target = if *is_add_on { &mut source.add_ons } else { &mut source.plans };
            push_entry(target, plan, features);
        }

        source.plans.retain(|(_, features)| !features.is_empty());
        source.add_ons.retain(|(_, features)| !features.is_empty());
        source
    }

    fn from_wide_matrix(
        headers: &[String],
        upper: &[String],
        ff_col: usize,
        add_on_col: Option<usize>,
        rows: &[Vec<String>],
    ) -> Self {
        let plan_cols: Vec<usize> = (0..headers.len())
            .filter(|&c| c != ff_col && Some(c) != add_on_col)
            .filter(|&c| !upper[c].contains("NOTE") && !upper[c].contains("COMMENT"))
            .filter(|&c| !headers[c].trim().is_empty())
            .filter(|&c| rows.iter().any(|r| is_truthy(r.get(c).map(String::as_str))))
            .collect();

        let mut source = PlanSource::default();
        for &c in &plan_cols {
            let features = rows
                .iter()
                .filter(|r| is_truthy(r.get(c).map(String::as_str)))
                .filter_map(|r| cell(r, ff_col))
                .map(str::to_string);
            push_entry(&mut source.plans, headers[c].trim(), features);
        }

        source.plans.retain(|(_, features)| !features.is_empty());
        source
    }

    /// Read a plan matrix CSV
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let (headers, rows) = read_csv_table(path)?;
        Ok(Self::from_matrix(&headers, &rows))
    }

    /// Dispatch on extension: `.csv` is a matrix, anything else JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        if has_extension(path, "csv") {
            Self::from_csv_path(path)
        } else {
            Self::from_json_file(path)
        }
    }

    /// Merge another source; plans with the same name union their features
    pub fn extend(&mut self, other: PlanSource) {
        for (name, features) in other.plans {
            push_entry(&mut self.plans, &name, features.into_iter());
        }
        for (name, features) in other.add_ons {
            push_entry(&mut self.add_ons, &name, features.into_iter());
        }
    }

    /// Flat plans plus an `ADD_ONS` family when bundles exist
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        for (name, features) in &self.plans {
            obj.insert(name.clone(), Value::from(features.clone()));
        }
        if !self.add_ons.is_empty() {
            let bundles: Map<String, Value> = self
                .add_ons
                .iter()
                .map(|(name, features)| (name.clone(), Value::from(features.clone())))
                .collect();
            obj.insert("ADD_ONS".to_string(), Value::Object(bundles));
        }
        Value::Object(obj)
    }
}

fn push_entry<I>(list: &mut Vec<(String, Vec<String>)>, name: &str, features: I)
where
    I: Iterator<Item = String>,
{
    let name = name.trim();
    if name.is_empty() || is_null_token(name) {
        return;
    }
    let idx = match list.iter().position(|(n, _)| n == name) {
        Some(i) => i,
        None => {
            list.push((name.to_string(), Vec::new()));
            list.len() - 1
        }
    };
    let entry = &mut list[idx].1;
    for f in features {
        let f = f.trim();
        if f.is_empty() || is_null_token(f) {
            continue;
        }
        if !entry.iter().any(|e| e == f) {
            entry.push(f.to_string());
        }
    }
}

/// `Add-On`, `ADD_ON`, `Addon` and similar marker headers
fn is_add_on_header(upper: &str) -> bool {
    upper
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .starts_with("ADDON")
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !is_null_token(s))
}

fn is_truthy(value: Option<&str>) -> bool {
    let Some(v) = value.map(str::trim) else {
        return false;
    };
    if v.is_empty() {
        return false;
    }
    if let Ok(n) = v.parse::<f64>() {
        return n != 0.0 && !n.is_nan();
    }
    !matches!(v.to_lowercase().as_str(), "nan" | "false" | "no")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn read_csv_table(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {:?}", path))?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {} of {:?}", idx + 1, path))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_feature_list_shapes() {
        assert_eq!(parse_feature_list(&json!(["a", " b ", "", null])), strings(&["a", "b"]));
        assert_eq!(parse_feature_list(&json!("['featA', 'featB']")), strings(&["featA", "featB"]));
        assert_eq!(parse_feature_list(&json!("[\"x\", \"y\"]")), strings(&["x", "y"]));
        assert_eq!(parse_feature_list(&json!("a, b ,c")), strings(&["a", "b", "c"]));
        assert_eq!(parse_feature_list(&json!("single")), strings(&["single"]));
        assert_eq!(parse_feature_list(&json!("'quoted'")), strings(&["quoted"]));
    }

    #[test]
    fn test_parse_feature_list_is_permissive() {
        assert!(parse_feature_list(&json!(null)).is_empty());
        assert!(parse_feature_list(&json!(42)).is_empty());
        assert!(parse_feature_list(&json!({"a": 1})).is_empty());
        assert!(parse_feature_list(&json!("nan")).is_empty());
        assert!(parse_feature_list(&json!("   ")).is_empty());
        assert!(parse_feature_list(&json!("[]")).is_empty());
        // Unbalanced quotes fall back to comma splitting
        assert_eq!(parse_feature_list(&json!("['a', 'b]")), strings(&["['a'", "'b]"]));
    }

    #[test]
    fn test_python_list_with_escapes_and_tuples() {
        assert_eq!(parse_feature_str(r"['it\'s', 'b',]"), strings(&["it's", "b"]));
        assert_eq!(parse_feature_str("('a', 'b')"), strings(&["a", "b"]));
        assert_eq!(parse_feature_str("['a', None]"), strings(&["a"]));
    }

    #[test]
    fn test_account_row_from_json() {
        let row = AccountRow::from_json(&json!({
            "name": "Acme Shipping",
            "Sub Type": "Shipowner",
            "featureNames": "['Port Control', 'uboData']",
        }));
        assert_eq!(row.display_name(), "Acme Shipping");
        assert_eq!(row.subtype.as_deref(), Some("Shipowner"));
        assert_eq!(row.features, strings(&["Port Control", "uboData"]));
    }

    #[test]
    fn test_account_row_fallback_columns() {
        let row = AccountRow::from_json(&json!({
            "Subtype": "Bunkering",
            "featureNames": "",
            "Enabled feature list": "a,b",
        }));
        assert_eq!(row.subtype.as_deref(), Some("Bunkering"));
        assert_eq!(row.features, strings(&["a", "b"]));

        let airtable = AccountRow::from_json(&json!({
            "id": "rec1",
            "fields": {"Account": "Beta", "FF": ["x"]}
        }));
        assert_eq!(airtable.display_name(), "Beta");
        assert_eq!(airtable.features, strings(&["x"]));

        assert_eq!(AccountRow::from_json(&json!("junk")), AccountRow::default());
    }

    #[test]
    fn test_plan_source_flat() {
        let source = PlanSource::from_json_value(&json!({
            "Bunkering Basic": ["portStateControl", " simpleFeature ", ""],
            "Bunkering Pro": ["portStateControl", "portStateControl"],
        }));
        assert_eq!(source.plans.len(), 2);
        assert_eq!(source.plans[0].0, "Bunkering Basic");
        assert_eq!(source.plans[0].1, strings(&["portStateControl", "simpleFeature"]));
        assert_eq!(source.plans[1].1, strings(&["portStateControl"]));
        assert!(source.add_ons.is_empty());
    }

    #[test]
    fn test_plan_source_nested_with_add_ons() {
        let source = PlanSource::from_json_value(&json!({
            "Global": {"GA": ["mapView"]},
            "Bunkering": {"Bunkering Core": ["a"], "Bunkering Plus": ["a", "b"]},
            "Standalone Plan": ["z"],
            "ADD_ONS": {"Compliance Pack": ["uboData", "sanctions"]},
            "EXTRAS": {"Extras": ["ignored"]},
        }));
        let names: Vec<&str> = source.plans.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["GA", "Bunkering Core", "Bunkering Plus", "Standalone Plan"]);
        assert_eq!(source.add_ons, vec![("Compliance Pack".to_string(), strings(&["uboData", "sanctions"]))]);

        let round = PlanSource::from_json_value(&source.to_json_value());
        assert_eq!(round, source);
    }

    #[test]
    fn test_matrix_long_format_forward_fills() {
        let headers = strings(&["Plan", "FF"]);
        let rows = vec![
            strings(&["Bunkering Basic", "portStateControl"]),
            strings(&["", "simpleFeature"]),
            strings(&["Bunkering Pro", "portStateControl"]),
            strings(&["", "nan"]),
        ];
        let source = PlanSource::from_matrix(&headers, &rows);
        let expected = PlanSource::new()
            .with_plan("Bunkering Basic", &["portStateControl", "simpleFeature"])
            .with_plan("Bunkering Pro", &["portStateControl"]);
        assert_eq!(source, expected);
    }

    #[test]
    fn test_matrix_long_format_add_on_marker() {
        let headers = strings(&["Plan", "Feature", "Add-On"]);
        let rows = vec![
            strings(&["Bunkering Basic", "portStateControl", ""]),
            strings(&["Compliance Pack", "sanctions", "yes"]),
            strings(&["", "pep", ""]),
        ];
        let source = PlanSource::from_matrix(&headers, &rows);
        let expected = PlanSource::new()
            .with_plan("Bunkering Basic", &["portStateControl"])
            .with_add_on("Compliance Pack", &["sanctions", "pep"]);
        assert_eq!(source, expected);
    }

    #[test]
    fn test_matrix_wide_format() {
        let headers = strings(&["Feature Flag", "Oil Core", "Oil Plus", "Notes"]);
        let rows = vec![
            strings(&["a", "x", "1", "keep"]),
            strings(&["b", "", "yes", "keep"]),
            strings(&["c", "0", "false", "keep"]),
        ];
        let source = PlanSource::from_matrix(&headers, &rows);
        let expected = PlanSource::new()
            .with_plan("Oil Core", &["a"])
            .with_plan("Oil Plus", &["a", "b"]);
        assert_eq!(source, expected);
    }

    #[test]
    fn test_matrix_positional_fallback() {
        let headers = strings(&["Bundle", "Item"]);
        let rows = vec![strings(&["Energy Core", "a"]), strings(&["", "b"])];
        let source = PlanSource::from_matrix(&headers, &rows);
        assert_eq!(source, PlanSource::new().with_plan("Energy Core", &["a", "b"]));
        assert!(PlanSource::from_matrix(&strings(&["only"]), &[]).is_empty());
    }

    #[test]
    fn test_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let plans = dir.path().join("plans.csv");
        std::fs::write(&plans, "PLAN,FF\nBunkering Basic,portStateControl\n,simpleFeature\n").unwrap();
        let source = PlanSource::from_path(&plans).unwrap();
        assert_eq!(source.plans[0].1, strings(&["portStateControl", "simpleFeature"]));

        let accounts = dir.path().join("accounts.csv");
        let mut f = std::fs::File::create(&accounts).unwrap();
        writeln!(f, "name,Sub Type,featureNames").unwrap();
        writeln!(f, "Acme,Bunkering,\"['Port Control']\"").unwrap();
        drop(f);
        let rows = load_accounts(&accounts).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].features, strings(&["Port Control"]));
    }

    #[test]
    fn test_load_accounts_json_wrappers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"rows": [{"name": "A", "Sub Type": "Oil", "featureNames": ["x"]}]}"#,
        )
        .unwrap();
        let rows = load_accounts(&path).unwrap();
        assert_eq!(rows[0].subtype.as_deref(), Some("Oil"));
        assert!(load_accounts(&dir.path().join("missing.json")).is_err());
    }
}
