//! Guided tour orchestration
//!
//! This crate drives a multi-step, multi-page walkthrough over a live UI:
//! - State machine over a copy-on-write working view of the step catalog
//! - Whole-screen fallback for targets that never become ready
//! - Cross-page continuation through a single session record
//! - One preference update per terminal outcome

pub mod continuation;
pub mod errors;
pub mod fallback;
pub mod orchestrator;
pub mod preferences;
pub mod types;

pub use continuation::{
    chain_next, ContinuationCoordinator, ContinuationIntent, MountDecision, CHAIN_ENTRY,
};
pub use errors::{ContinuationError, PreferenceError};
pub use fallback::apply_fallback;
pub use orchestrator::{TourDeps, TourOrchestrator};
pub use preferences::{
    HttpPreferenceClient, HttpPreferenceConfig, OnboardingStatus, PreferenceCall,
    PreferenceReporter, PreferenceService,
};
pub use types::{
    LifecycleEvent, Navigator, Outcome, Phase, RenderFrame, RenderSink, StartRequest, StepAction,
    TerminalStatus, TourEvent, TourSnapshot,
};
