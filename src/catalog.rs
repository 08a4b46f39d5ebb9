//! Plan catalog
//!
//! Built once from a `PlanSource`; every feature is canonicalized at load.
//! Plans keep their source order so that ranking ties resolve the same way
//! on every run.

use crate::canonical::Canonicalizer;
use crate::sources::PlanSource;
use crate::types::AppliedAddOn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named bundle of canonical features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub name: String,
    pub features: BTreeSet<String>,
}

impl PlanDefinition {
    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Add-on bundles share the plan shape
pub type AddOnBundle = PlanDefinition;

/// Immutable plan and add-on definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanCatalog {
    plans: Vec<PlanDefinition>,
    add_ons: Vec<AddOnBundle>,
}

impl PlanCatalog {
    pub fn from_source(source: &PlanSource, canon: &Canonicalizer) -> Self {
        Self {
            plans: build_definitions(&source.plans, canon),
            add_ons: build_definitions(&source.add_ons, canon),
        }
    }

    /// Plans in source order
    pub fn plan_definitions(&self) -> &[PlanDefinition] {
        &self.plans
    }

    pub fn add_on_plans(&self) -> &[AddOnBundle] {
        &self.add_ons
    }

    /// Exact name match, then case-insensitive
    pub fn plan(&self, name: &str) -> Option<&PlanDefinition> {
        let name = name.trim();
        self.plans.iter().find(|p| p.name == name).or_else(|| {
            let lower = name.to_lowercase();
            self.plans.iter().find(|p| p.name.to_lowercase() == lower)
        })
    }

    pub fn add_on(&self, name: &str) -> Option<&AddOnBundle> {
        let lower = name.trim().to_lowercase();
        self.add_ons.iter().find(|a| a.name.to_lowercase() == lower)
    }

    pub fn plan_names(&self) -> Vec<String> {
        self.plans.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Union of every plan's features
    pub fn all_plan_features(&self) -> BTreeSet<String> {
        self.plans
            .iter()
            .flat_map(|p| p.features.iter().cloned())
            .collect()
    }

    /// Union of every plan and add-on feature
    pub fn all_known_features(&self) -> BTreeSet<String> {
        self.plans
            .iter()
            .chain(self.add_ons.iter())
            .flat_map(|p| p.features.iter().cloned())
            .collect()
    }

    /// Add-on bundles that supply account features the base plan lacks.
    ///
    /// Bundles are visited in catalog order. Each one only receives features
    /// that no earlier bundle already supplied, and only the used subset is
    /// reported, never the whole bundle.
    ///
    /// A bundle whose used features all sit in the base plan is not applied
    /// even though the account uses it. It would only add an extra for
    /// features the plan already grants.
    pub fn applied_add_ons(
        &self,
        base_normal: &BTreeSet<String>,
        user_normal: &BTreeSet<String>,
    ) -> Vec<AppliedAddOn> {
        let mut needed: BTreeSet<&String> = user_normal.difference(base_normal).collect();
        let mut applied = Vec::new();

        for bundle in &self.add_ons {
            if needed.is_empty() {
                break;
            }
            let supplied: Vec<String> = needed
                .iter()
                .filter(|f| bundle.features.contains(f.as_str()))
                .map(|f| (*f).clone())
                .collect();
            if supplied.is_empty() {
                continue;
            }
            for f in &supplied {
                needed.remove(f);
            }
            applied.push(AppliedAddOn {
                name: bundle.name.clone(),
                supplied,
            });
        }

        applied
    }
}

fn build_definitions(entries: &[(String, Vec<String>)], canon: &Canonicalizer) -> Vec<PlanDefinition> {
    let mut out: Vec<PlanDefinition> = Vec::new();
    for (name, features) in entries {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let canonical: BTreeSet<String> = canon.canonicalize_all(features).into_iter().collect();
        match out.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.features.extend(canonical),
            None => out.push(PlanDefinition {
                name: name.to_string(),
                features: canonical,
            }),
        }
    }
    out
}
