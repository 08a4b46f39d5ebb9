//! Engine configuration
//!
//! Everything the engine needs to know about the business lives here:
//! - GA features (available to everyone, never counted)
//! - Irrelevant features (ignored entirely)
//! - Costly features (must never be granted as free bloat)
//! - Subtype keyword table (account subtype → plan family)
//! - Synonyms (display name → canonical flag name)
//! - Scoring weights
//!
//! Configuration is injected into each `MigrationEngine` at construction.
//! Nothing here is global, so engines with different configs can coexist.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "PLANFIT_CONFIG";

/// Penalty applied per costly feature found in bloat
pub const DEFAULT_COST_BLOAT_WEIGHT: u32 = 100;

/// One row of the ordered subtype → family table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubtypeKeyword {
    /// Lowercase substring searched for in the account subtype
    pub keyword: String,
    /// Family name searched for in plan names
    pub family: String,
}

impl SubtypeKeyword {
    pub fn new(keyword: &str, family: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            family: family.to_string(),
        }
    }
}

/// Weights for the business-value and migration-confidence formulas.
///
/// The defaults were chosen empirically; deployments are expected to
/// calibrate them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    /// Multiplier on the coverage ratio (covered / account features)
    pub coverage: f64,
    /// Bonus when the plan belongs to the account's family (or, for
    /// confidence, when the mapping is unambiguous)
    pub alignment: f64,
    /// Penalty per feature extra
    pub extra_penalty: f64,
    /// Penalty per missing critical feature
    pub missing_critical_penalty: f64,
    /// Penalty per raw feature that needed a synonym to resolve
    pub synonym_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            coverage: 30.0,
            alignment: 10.0,
            extra_penalty: 2.0,
            missing_critical_penalty: 20.0,
            synonym_penalty: 5.0,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub ga_features: Vec<String>,
    pub irrelevant_features: Vec<String>,
    /// Matched case-insensitively
    pub costly_features: Vec<String>,
    /// Features whose absence from a plan counts as a missing critical
    pub critical_features: Vec<String>,
    /// Ordered; the first keyword contained in the subtype wins
    pub subtype_keywords: Vec<SubtypeKeyword>,
    pub cost_bloat_weight: u32,
    /// Display name → canonical name, keys matched case-insensitively
    pub synonyms: BTreeMap<String, String>,
    pub scoring: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ga_features: Vec::new(),
            irrelevant_features: Vec::new(),
            costly_features: default_costly_features(),
            critical_features: Vec::new(),
            subtype_keywords: default_subtype_keywords(),
            cost_bloat_weight: DEFAULT_COST_BLOAT_WEIGHT,
            synonyms: default_synonyms(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Resolve the effective config.
    ///
    /// Order: explicit path, `$PLANFIT_CONFIG`, `<data_dir>/planfit/config.json`
    /// when it exists, built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            if !env_path.trim().is_empty() {
                return Self::from_file(Path::new(env_path.trim()));
            }
        }

        let default_path = get_data_dir().join("config.json");
        if default_path.exists() {
            tracing::info!("Loading config from {:?}", default_path);
            return Self::from_file(&default_path);
        }

        Ok(Self::default())
    }

    /// Override the costly-bloat penalty
    pub fn with_cost_bloat_weight(mut self, weight: u32) -> Self {
        self.cost_bloat_weight = weight;
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Default data directory (`~/.local/share/planfit` on Linux)
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planfit")
}

fn default_subtype_keywords() -> Vec<SubtypeKeyword> {
    [
        ("bunkering", "Bunkering"),
        ("oil", "Oil"),
        ("energy", "Energy"),
        ("shipowner", "Shipowners"),
        ("operator", "Shipowners"),
        ("insurance", "Insurer"),
        ("insurer", "Insurer"),
        ("financial", "Financial"),
        ("bank", "Financial"),
        ("commodity", "Commodity"),
        ("trader", "Trader"),
        ("freight", "Maritime"),
        ("maritime", "Maritime"),
    ]
    .iter()
    .map(|(k, f)| SubtypeKeyword::new(k, f))
    .collect()
}

fn default_costly_features() -> Vec<String> {
    [
        "maiExpertVesselAdverseMedia",
        "maiExpertVesselSummary",
        "uboData",
        "wetCargoData",
        "nasaGridTable",
        "nasagGridTable",
        "vlaMaiExpert",
        "visualLinkAnalysis",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_synonyms() -> BTreeMap<String, String> {
    [
        ("Advanced Search", "advancedSearchOwners"),
        ("Port Control", "portStateControl"),
        ("Weather Map", "weatherLayer"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cost_bloat_weight, 100);
        assert_eq!(config.subtype_keywords[0].keyword, "bunkering");
        assert_eq!(
            config.synonyms.get("Port Control").map(String::as_str),
            Some("portStateControl")
        );
        assert!(config.costly_features.iter().any(|f| f == "uboData"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ga_features": ["vesselSearch"], "cost_bloat_weight": 7, "scoring": {{"coverage": 50.0}}}}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ga_features, vec!["vesselSearch".to_string()]);
        assert_eq!(config.cost_bloat_weight, 7);
        assert_eq!(config.scoring.coverage, 50.0);
        assert_eq!(config.scoring.synonym_penalty, 5.0);
        assert_eq!(config.subtype_keywords.len(), 13);
    }

    #[test]
    fn test_explicit_path_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cost_bloat_weight": 3}}"#).unwrap();
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cost_bloat_weight, 3);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(EngineConfig::from_file(file.path()).is_err());
    }
}
