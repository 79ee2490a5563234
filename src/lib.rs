//! Guided tour harness
//!
//! Replays scripted sessions against the tour engine for integration testing

pub mod cli;
pub mod harness;

pub use harness::{replay, ReplayOptions, ReplayReport, Scenario};
