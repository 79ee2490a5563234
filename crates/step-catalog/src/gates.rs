//! Declarative dependency gates
//!
//! A gate table maps step target patterns to the prerequisite control that
//! must be active before the target exists. It is built once per catalog.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::types::Target;

/// Stable key of a prerequisite control
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrerequisiteKey(pub String);

impl PrerequisiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for PrerequisiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the prerequisite is switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrerequisiteKind {
    /// A checkbox or switch that reveals dependent settings
    Toggle,

    /// A tab whose panel hosts the dependent section
    Tab,
}

impl PrerequisiteKind {
    pub fn name(&self) -> &'static str {
        match self {
            PrerequisiteKind::Toggle => "toggle",
            PrerequisiteKind::Tab => "tab",
        }
    }
}

/// A control that gates one or more steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub key: PrerequisiteKey,
    pub kind: PrerequisiteKind,

    /// Selector of the control to click
    pub control: String,
}

impl Prerequisite {
    pub fn toggle(key: &str, control: impl Into<String>) -> Self {
        Self {
            key: PrerequisiteKey::new(key),
            kind: PrerequisiteKind::Toggle,
            control: control.into(),
        }
    }

    pub fn tab(key: &str, control: impl Into<String>) -> Self {
        Self {
            key: PrerequisiteKey::new(key),
            kind: PrerequisiteKind::Tab,
            control: control.into(),
        }
    }
}

/// Pattern over logical target names. A trailing `*` matches by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRule {
    pub pattern: String,
    pub prerequisite: PrerequisiteKey,
}

impl GateRule {
    pub fn matches(&self, logical: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => logical.starts_with(prefix),
            None => logical == self.pattern,
        }
    }
}

/// Table `{step target pattern -> prerequisite}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateTable {
    rules: Vec<GateRule>,
    prerequisites: HashMap<PrerequisiteKey, Prerequisite>,
}

impl GateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisites
            .insert(prerequisite.key.clone(), prerequisite);
        self
    }

    pub fn with_rule(mut self, pattern: &str, prerequisite: &str) -> Self {
        self.rules.push(GateRule {
            pattern: pattern.to_string(),
            prerequisite: PrerequisiteKey::new(prerequisite),
        });
        self
    }

    /// Every rule must name a defined prerequisite
    pub fn validate(&self) -> Result<(), CatalogError> {
        for rule in &self.rules {
            if !self.prerequisites.contains_key(&rule.prerequisite) {
                return Err(CatalogError::UnknownPrerequisite(
                    rule.prerequisite.0.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Prerequisite gating the given target, first matching rule wins
    pub fn gate_for(&self, target: &Target) -> Option<&Prerequisite> {
        let selector = target.selector()?;
        self.rules
            .iter()
            .find(|rule| rule.matches(&selector.logical))
            .and_then(|rule| self.prerequisites.get(&rule.prerequisite))
    }

    /// Whether the target lives in a panel that a tab switch will reveal
    pub fn is_deferred(&self, target: &Target) -> bool {
        self.gate_for(target)
            .map(|p| p.kind == PrerequisiteKind::Tab)
            .unwrap_or(false)
    }

    pub fn prerequisite(&self, key: &PrerequisiteKey) -> Option<&Prerequisite> {
        self.prerequisites.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
