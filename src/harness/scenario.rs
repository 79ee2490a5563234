//! Scenario files: a scripted user session across one or more page loads.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tour_core_types::{PageKey, Role};
use tour_orchestrator::{LifecycleEvent, OnboardingStatus, Phase, StartRequest};
use tour_readiness::{ControlSpec, NodeSpec};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("scenario has no pages")]
    Empty,

    #[error("page {page}: node {node} is revealed by a control but never declared")]
    UnknownReveal { page: PageKey, node: String },

    #[error("page {page}, action {index}: expectation failed: {detail}")]
    Expectation {
        page: PageKey,
        index: usize,
        detail: String,
    },
}

fn default_role() -> Role {
    Role::Attendee
}

fn default_true() -> bool {
    true
}

/// A scripted session. Pages share storage, the wall clock and the
/// preference backend; each page gets a fresh render tree.
#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    /// Wall clock at the first page load; defaults to now
    #[serde(default)]
    pub start_millis: Option<i64>,
    /// What the preference backend reports before anything is recorded
    #[serde(default)]
    pub status: OnboardingStatus,
    /// Policy overrides applied through the policy center, by dot-path
    #[serde(default)]
    pub overrides: BTreeMap<String, serde_json::Value>,
    pub pages: Vec<PageScript>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PageScript {
    pub page: PageKey,
    #[serde(default)]
    pub role: Option<Role>,
    /// Run the mount-time decision (resume, auto-start or stay)
    #[serde(default = "default_true")]
    pub mount: bool,
    #[serde(default)]
    pub expect_mount: Option<MountExpectation>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountExpectation {
    Resume,
    AutoStart,
    Stay,
}

/// One scripted step against the mounted page
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start(StartRequest),
    Event(LifecycleEvent),
    /// Show and confirm this many steps from the current cursor
    Walk(usize),
    /// Let timers run for this many milliseconds
    Wait(u64),
    /// Move the wall clock forward without running timers
    Clock(i64),
    Close,
    Skip,
    Finish,
    SetRole(Role),
    Insert(NodeSpec),
    Remove(String),
    Expect(Expectation),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub cursor: Option<usize>,
    #[serde(default)]
    pub patched: Option<Vec<usize>>,
    #[serde(default)]
    pub steps: Option<usize>,
}

impl Scenario {
    pub fn from_yaml(source: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(source)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.pages.is_empty() {
            return Err(ScenarioError::Empty);
        }
        for script in &self.pages {
            for control in &script.controls {
                for node in &control.reveals {
                    if !script.nodes.iter().any(|spec| &spec.id == node) {
                        return Err(ScenarioError::UnknownReveal {
                            page: script.page,
                            node: node.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
