//! Dependency gate for tour steps
//!
//! Some steps point at elements that only exist once a toggle is ticked or a
//! tab is selected. This crate implements:
//! - Idempotent activation of the prerequisite control, at most once per run
//! - Bounded polling of strict readiness after activation
//! - Poll budgets derived from the gate policy per prerequisite kind

pub mod errors;
pub mod resolver;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use types::*;
