//! Immutable step catalogs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tour_core_types::{PageKey, Role};

use crate::errors::CatalogError;
use crate::gates::GateTable;
use crate::types::{StepDescriptor, Target};

/// Ordered steps for one role on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCatalog {
    page: PageKey,
    role: Option<Role>,
    steps: Vec<StepDescriptor>,
    has_welcome: bool,
    #[serde(default)]
    gates: GateTable,
}

impl StepCatalog {
    pub fn builder(page: PageKey) -> CatalogBuilder {
        CatalogBuilder::new(page)
    }

    /// Validates an ad-hoc step list supplied by a caller
    pub fn custom(
        page: PageKey,
        steps: Vec<StepDescriptor>,
        gates: GateTable,
    ) -> Result<Self, CatalogError> {
        let has_welcome = steps.first().map(|s| s.is_whole_screen()).unwrap_or(false);
        let catalog = Self {
            page,
            role: None,
            steps,
            has_welcome,
            gates,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::Empty(self.page.to_string()));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !step.is_consistent() {
                return Err(CatalogError::WholeScreenPlacement { index });
            }
            if let Target::Element(selector) = step.target() {
                if selector.selectors.iter().all(|s| s.trim().is_empty()) {
                    return Err(CatalogError::EmptySelector { index });
                }
            }
        }
        self.gates.validate()
    }

    pub fn page(&self) -> PageKey {
        self.page
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether step 0 is a generic welcome message
    pub fn has_welcome(&self) -> bool {
        self.has_welcome
    }

    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    /// Index of the first content step, skipping the welcome when present
    pub fn first_content_index(&self) -> usize {
        if self.has_welcome && self.steps.len() > 1 {
            1
        } else {
            0
        }
    }
}

/// Builder used by the per-page catalog functions
#[derive(Debug)]
pub struct CatalogBuilder {
    page: PageKey,
    role: Option<Role>,
    steps: Vec<StepDescriptor>,
    has_welcome: bool,
    gates: GateTable,
}

impl CatalogBuilder {
    pub fn new(page: PageKey) -> Self {
        Self {
            page,
            role: None,
            steps: Vec::new(),
            has_welcome: false,
            gates: GateTable::new(),
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Adds the welcome step; must be the first step added
    pub fn welcome(mut self, content: serde_json::Value) -> Self {
        if self.steps.is_empty() {
            self.steps.push(StepDescriptor::whole_screen(content));
            self.has_welcome = true;
        }
        self
    }

    pub fn step(mut self, step: StepDescriptor) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_if(self, condition: bool, step: StepDescriptor) -> Self {
        if condition {
            self.step(step)
        } else {
            self
        }
    }

    pub fn gates(mut self, gates: GateTable) -> Self {
        self.gates = gates;
        self
    }

    pub fn build(self) -> Result<StepCatalog, CatalogError> {
        let catalog = StepCatalog {
            page: self.page,
            role: self.role,
            steps: self.steps,
            has_welcome: self.has_welcome,
            gates: self.gates,
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

/// Catalog currently driving a run.
///
/// Only `Base` catalogs are regenerated when the role changes; a `Custom`
/// catalog supplied by a caller stays until the caller replaces it.
#[derive(Debug, Clone)]
pub enum Catalog {
    Base(Arc<StepCatalog>),
    Custom(Arc<StepCatalog>),
}

impl Catalog {
    pub fn steps(&self) -> &Arc<StepCatalog> {
        match self {
            Catalog::Base(steps) | Catalog::Custom(steps) => steps,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Catalog::Custom(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Placement, TargetSelector};
    use serde_json::json;

    #[test]
    fn builder_marks_welcome_step() {
        let catalog = StepCatalog::builder(PageKey::Calendar)
            .role(Role::Attendee)
            .welcome(json!({"title": "Calendar"}))
            .step(StepDescriptor::element(
                TargetSelector::css("#calendar-view"),
                json!({}),
                Placement::Bottom,
            ))
            .build()
            .unwrap();

        assert!(catalog.has_welcome());
        assert_eq!(catalog.first_content_index(), 1);
        assert_eq!(catalog.role(), Some(Role::Attendee));
    }

    #[test]
    fn welcome_only_catalog_starts_at_zero() {
        let catalog = StepCatalog::builder(PageKey::Formats)
            .welcome(json!({}))
            .build()
            .unwrap();
        assert_eq!(catalog.first_content_index(), 0);
    }

    #[test]
    fn custom_catalog_rejects_empty_and_inconsistent_steps() {
        assert_eq!(
            StepCatalog::custom(PageKey::Dashboard, vec![], GateTable::new()).unwrap_err(),
            CatalogError::Empty("dashboard".into())
        );

        let broken: StepDescriptor = serde_json::from_value(json!({
            "target": {"kind": "whole-screen"},
            "placement": "left"
        }))
        .unwrap();
        assert_eq!(
            StepCatalog::custom(PageKey::Dashboard, vec![broken], GateTable::new()).unwrap_err(),
            CatalogError::WholeScreenPlacement { index: 0 }
        );
    }
}
