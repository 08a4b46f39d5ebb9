//! GA / Irrelevant / Normal feature classification
//!
//! Applied symmetrically to the account's features and to a plan's
//! (plus add-ons) features before any comparison, so GA and irrelevant
//! features can never show up as extras or bloat on either side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A feature set partitioned into the three buckets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classified {
    pub ga: BTreeSet<String>,
    pub irrelevant: BTreeSet<String>,
    pub normal: BTreeSet<String>,
}

impl Classified {
    /// Union of two classifications, bucket by bucket
    pub fn merge(&self, other: &Classified) -> Classified {
        Classified {
            ga: self.ga.union(&other.ga).cloned().collect(),
            irrelevant: self.irrelevant.union(&other.irrelevant).cloned().collect(),
            normal: self.normal.union(&other.normal).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ga.len() + self.irrelevant.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifier holding the canonical GA and Irrelevant sets
#[derive(Debug, Clone, Default)]
pub struct FeatureClassifier {
    ga: BTreeSet<String>,
    irrelevant: BTreeSet<String>,
}

impl FeatureClassifier {
    /// Both sets must already be canonical. A feature listed in both stays GA.
    pub fn new(ga: BTreeSet<String>, irrelevant: BTreeSet<String>) -> Self {
        let irrelevant = irrelevant.difference(&ga).cloned().collect();
        Self { ga, irrelevant }
    }

    /// Partition canonical features. GA is checked first.
    pub fn classify<I, S>(&self, features: I) -> Classified
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Classified::default();
        for feature in features {
            let f = feature.as_ref();
            if f.is_empty() {
                continue;
            }
            if self.ga.contains(f) {
                out.ga.insert(f.to_string());
            } else if self.irrelevant.contains(f) {
                out.irrelevant.insert(f.to_string());
            } else {
                out.normal.insert(f.to_string());
            }
        }
        out
    }

    pub fn is_ga(&self, feature: &str) -> bool {
        self.ga.contains(feature)
    }

    pub fn is_irrelevant(&self, feature: &str) -> bool {
        self.irrelevant.contains(feature)
    }

    pub fn ga_set(&self) -> &BTreeSet<String> {
        &self.ga
    }

    pub fn irrelevant_set(&self) -> &BTreeSet<String> {
        &self.irrelevant
    }
}
