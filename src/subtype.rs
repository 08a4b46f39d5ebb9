//! Subtype → plan family filter

use crate::catalog::PlanCatalog;
use crate::config::SubtypeKeyword;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct SubtypeFilter {
    keywords: Vec<SubtypeKeyword>,
}

impl SubtypeFilter {
    pub fn new(keywords: Vec<SubtypeKeyword>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| SubtypeKeyword::new(k.keyword.trim(), k.family.trim()))
            .filter(|k| !k.keyword.is_empty() && !k.family.is_empty())
            .collect();
        Self { keywords }
    }

    /// Family of the first keyword contained in the lowercased subtype
    pub fn family_for(&self, subtype: &str) -> Option<&str> {
        let s = subtype.to_lowercase();
        self.keywords
            .iter()
            .find(|k| s.contains(&k.keyword))
            .map(|k| k.family.as_str())
    }

    /// Plans whose name contains the subtype's family, in catalog order
    pub fn relevant_plans(&self, subtype: Option<&str>, catalog: &PlanCatalog) -> Vec<String> {
        let Some(family) = subtype.and_then(|s| self.family_for(s)) else {
            return Vec::new();
        };
        let family = family.to_lowercase();
        catalog
            .plan_definitions()
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&family))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Distinct family names, table order
    pub fn families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for k in &self.keywords {
            if !out.contains(&k.family.as_str()) {
                out.push(&k.family);
            }
        }
        out
    }

    /// Every family whose name appears in the plan name
    pub fn families_in_plan_name(&self, plan: &str) -> BTreeSet<String> {
        let lower = plan.to_lowercase();
        self.families()
            .into_iter()
            .filter(|f| lower.contains(&f.to_lowercase()))
            .map(str::to_string)
            .collect()
    }

    pub fn is_aligned(&self, subtype: Option<&str>, plan: &str) -> bool {
        subtype
            .and_then(|s| self.family_for(s))
            .map(|f| plan.to_lowercase().contains(&f.to_lowercase()))
            .unwrap_or(false)
    }
}
