//! Logical target table
//!
//! Duplicate selectors are resolved here, once, when a catalog is built:
//! each logical name maps to an ordered selector list and a region rule.

use std::collections::HashMap;

use crate::errors::CatalogError;
use crate::types::{RegionPreference, TargetSelector};

#[derive(Debug, Clone, PartialEq, Eq)]
struct TargetEntry {
    selectors: Vec<String>,
    region: RegionPreference,
}

/// Mapping `{logical name -> [preferred selector, fallback selector, ...]}`
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    entries: HashMap<String, TargetEntry>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a logical target whose content element wins over any
    /// navigation shortcut matching the same selectors
    pub fn define<I, S>(mut self, logical: &str, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(logical, selectors, RegionPreference::PreferContent);
        self
    }

    /// Register a logical target that must resolve to the navigation entry
    pub fn define_navigation<I, S>(mut self, logical: &str, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(logical, selectors, RegionPreference::PinNavigation);
        self
    }

    fn insert<I, S>(&mut self, logical: &str, selectors: I, region: RegionPreference)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selectors: Vec<String> = selectors.into_iter().map(Into::into).collect();
        self.entries
            .insert(logical.to_string(), TargetEntry { selectors, region });
    }

    /// Resolve a logical name into a concrete target selector
    pub fn resolve(&self, logical: &str) -> Result<TargetSelector, CatalogError> {
        let entry = self
            .entries
            .get(logical)
            .filter(|entry| !entry.selectors.is_empty())
            .ok_or_else(|| CatalogError::UnknownTarget(logical.to_string()))?;
        Ok(TargetSelector {
            logical: logical.to_string(),
            selectors: entry.selectors.clone(),
            region: entry.region,
        })
    }

    pub fn contains(&self, logical: &str) -> bool {
        self.entries.contains_key(logical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
