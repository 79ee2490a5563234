//! Step catalogs for the guided tour
//!
//! This crate holds the tour data model:
//! - Step descriptors with whole-screen or element targets
//! - Logical target table resolving duplicate selectors at build time
//! - Declarative gate table mapping steps to prerequisite controls
//! - Per-page, per-role catalog builders
//! - Copy-on-write working view used by the orchestrator

pub mod builders;
pub mod catalog;
pub mod errors;
pub mod gates;
pub mod targets;
pub mod types;
pub mod view;

pub use builders::{build_catalog, build_for_role};
pub use catalog::{Catalog, CatalogBuilder, StepCatalog};
pub use errors::*;
pub use gates::*;
pub use targets::*;
pub use types::*;
pub use view::{PatchSet, WorkingView};
