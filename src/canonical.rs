//! Feature name canonicalization
//!
//! Raw feature flags arrive from spreadsheets and CRM exports with stray
//! whitespace, display names instead of flag names, and inconsistent casing.
//! Canonicalization maps all of these onto one spelling:
//!
//! 1. Trim whitespace (empty stays empty)
//! 2. Synonym table: display name → canonical name (case-insensitive key)
//! 3. Alias table: case-insensitive lookup against every known feature
//! 4. Otherwise the trimmed input, unchanged (open world)
//!
//! Steps 2-3 repeat until nothing changes, so `canonicalize` is idempotent.

use std::collections::{BTreeMap, HashMap};

/// Normalize a feature name for comparison (strips whitespace)
pub fn clean_feature_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Single-step synonym canonicalization without an alias table.
///
/// Kept for callers that only hold a synonym map. `Canonicalizer` is the
/// full version used by the engine.
pub fn canonicalize(name: &str, synonyms: Option<&BTreeMap<String, String>>) -> String {
    let s = clean_feature_name(name);
    if s.is_empty() {
        return s;
    }
    if let Some(syn) = synonyms {
        let lower = s.to_lowercase();
        for (k, v) in syn {
            if k.trim().to_lowercase() == lower {
                return v.trim().to_string();
            }
        }
    }
    s
}

/// Canonicalizer with synonym and alias tables
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    /// lowercase display name → canonical name
    synonyms: HashMap<String, String>,
    /// lowercase feature name → first spelling seen
    aliases: HashMap<String, String>,
}

impl Canonicalizer {
    pub fn new(synonyms: &BTreeMap<String, String>) -> Self {
        let mut table = HashMap::new();
        for (display, canonical) in synonyms {
            let key = display.trim().to_lowercase();
            let value = canonical.trim().to_string();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            table.entry(key).or_insert(value);
        }
        Self {
            synonyms: table,
            aliases: HashMap::new(),
        }
    }

    /// Register known feature names for case-insensitive snapping.
    ///
    /// Names are synonym-resolved before they enter the table; the first
    /// spelling seen for a given lowercase key wins.
    pub fn with_known_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for feature in features {
            let canonical = self.canonicalize(feature.as_ref());
            if canonical.is_empty() {
                continue;
            }
            self.aliases
                .entry(canonical.to_lowercase())
                .or_insert(canonical);
        }
        self
    }

    /// Canonical form of a raw feature name
    pub fn canonicalize(&self, raw: &str) -> String {
        let mut current = clean_feature_name(raw);
        let mut seen: Vec<String> = Vec::new();
        let limit = self.synonyms.len() + self.aliases.len() + 2;

        loop {
            let next = self.step(&current);
            if next == current {
                return current;
            }
            if let Some(pos) = seen.iter().position(|s| *s == next) {
                // Misconfigured synonym cycle: settle on its smallest member
                return seen[pos..]
                    .iter()
                    .chain(std::iter::once(&current))
                    .min()
                    .cloned()
                    .unwrap_or(current);
            }
            seen.push(current);
            current = next;
            if seen.len() > limit {
                return current;
            }
        }
    }

    /// Canonicalize many names, dropping empties
    pub fn canonicalize_all<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .map(|f| self.canonicalize(f.as_ref()))
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// True when the raw name needed a synonym or alias to resolve
    pub fn is_synonym_hit(&self, raw: &str) -> bool {
        let cleaned = clean_feature_name(raw);
        !cleaned.is_empty() && self.canonicalize(raw) != cleaned
    }

    /// Whether a name is known to the alias table (case-insensitive)
    pub fn is_known(&self, name: &str) -> bool {
        self.aliases
            .contains_key(&clean_feature_name(name).to_lowercase())
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    fn step(&self, s: &str) -> String {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let lower = trimmed.to_lowercase();
        if let Some(v) = self.synonyms.get(&lower) {
            return v.clone();
        }
        if let Some(a) = self.aliases.get(&lower) {
            return a.clone();
        }
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn synonyms(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn shipping_canonicalizer() -> Canonicalizer {
        Canonicalizer::new(&synonyms(&[
            ("Port Control", "portStateControl"),
            ("Weather Map", "weatherLayer"),
            ("Old Search", "Advanced Search"),
            ("Advanced Search", "advancedSearchOwners"),
            ("loopA", "loopB"),
            ("loopB", "loopA"),
        ]))
        .with_known_features(["portStateControl", "uboData", "weatherLayer", "UBODATA"])
    }

    #[test]
    fn test_trim_and_passthrough() {
        let c = shipping_canonicalizer();
        assert_eq!(c.canonicalize("  somethingNew  "), "somethingNew");
        assert_eq!(c.canonicalize("   "), "");
        assert_eq!(c.canonicalize(""), "");
    }

    #[test]
    fn test_synonym_is_case_insensitive() {
        let c = shipping_canonicalizer();
        assert_eq!(c.canonicalize("port control"), "portStateControl");
        assert_eq!(c.canonicalize(" PORT CONTROL "), "portStateControl");
    }

    #[test]
    fn test_alias_snaps_casing_first_spelling_wins() {
        let c = shipping_canonicalizer();
        assert_eq!(c.canonicalize("ubodata"), "uboData");
        assert_eq!(c.canonicalize("UBODATA"), "uboData");
        assert_eq!(c.canonicalize("PortStateControl"), "portStateControl");
    }

    #[test]
    fn test_synonym_chain_resolves_fully() {
        let c = shipping_canonicalizer();
        assert_eq!(c.canonicalize("old search"), "advancedSearchOwners");
    }

    #[test]
    fn test_synonym_cycle_settles() {
        let c = shipping_canonicalizer();
        assert_eq!(c.canonicalize("loopA"), "loopA");
        assert_eq!(c.canonicalize("loopB"), "loopA");
    }

    #[test]
    fn test_synonym_hits() {
        let c = shipping_canonicalizer();
        assert!(c.is_synonym_hit("Port Control"));
        assert!(!c.is_synonym_hit("portStateControl"));
        assert!(!c.is_synonym_hit("  portStateControl "));
        assert!(!c.is_synonym_hit(""));
    }

    #[test]
    fn test_free_function_single_step() {
        let syn = synonyms(&[("Port Control", "portStateControl")]);
        assert_eq!(canonicalize(" port control", Some(&syn)), "portStateControl");
        assert_eq!(canonicalize("other", Some(&syn)), "other");
        assert_eq!(canonicalize(" other ", None), "other");
    }

    #[test]
    fn test_known_features() {
        let c = shipping_canonicalizer();
        assert!(c.is_known("WEATHERLAYER"));
        assert!(!c.is_known("nope"));
        assert_eq!(c.alias_count(), 3);
    }

    proptest! {
        #[test]
        fn prop_canonicalize_is_idempotent(raw in "[ a-zA-Z]{0,16}") {
            let c = shipping_canonicalizer();
            let once = c.canonicalize(&raw);
            prop_assert_eq!(c.canonicalize(&once), once);
        }

        #[test]
        fn prop_known_names_are_idempotent(idx in 0usize..8, upper in any::<bool>()) {
            let names = ["Port Control", "Weather Map", "Old Search", "Advanced Search",
                         "loopA", "loopB", "uboData", "portStateControl"];
            let raw = if upper { names[idx].to_uppercase() } else { names[idx].to_string() };
            let c = shipping_canonicalizer();
            let once = c.canonicalize(&raw);
            prop_assert_eq!(c.canonicalize(&once), once);
        }
    }
}
