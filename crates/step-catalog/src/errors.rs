//! Error types for catalog construction

use thiserror::Error;

/// Catalog error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Catalog has no steps
    #[error("Catalog for {0} has no steps")]
    Empty(String),

    /// Whole-screen step placed anywhere but center
    #[error("Step {index} targets the whole screen but is not centered")]
    WholeScreenPlacement { index: usize },

    /// Element target without any selector
    #[error("Step {index} has an element target without selectors")]
    EmptySelector { index: usize },

    /// Logical target missing from the target table
    #[error("Unknown logical target: {0}")]
    UnknownTarget(String),

    /// Gate rule refers to an undefined prerequisite
    #[error("Gate rule references unknown prerequisite: {0}")]
    UnknownPrerequisite(String),
}

impl CatalogError {
    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            CatalogError::Empty(_) => 1,
            CatalogError::UnknownTarget(_) | CatalogError::UnknownPrerequisite(_) => 2,
            _ => 3,
        }
    }
}

impl From<CatalogError> for tour_core_types::TourError {
    fn from(err: CatalogError) -> Self {
        tour_core_types::TourError::new(err.to_string())
    }
}
