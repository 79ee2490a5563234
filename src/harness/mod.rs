pub mod adapters;
pub mod replay;
pub mod scenario;

pub use adapters::{RecordingNavigator, ScriptedPreferences, TracingSink};
pub use replay::{replay, PageReport, ReplayError, ReplayOptions, ReplayReport};
pub use scenario::{Action, Expectation, MountExpectation, PageScript, Scenario, ScenarioError};
