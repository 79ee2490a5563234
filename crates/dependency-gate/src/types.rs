//! Core types for the dependency gate

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use step_catalog::{PrerequisiteKey, PrerequisiteKind};
use tour_policy::GatePolicy;

/// What `ensure_active` did with the control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Clicked now
    Clicked,

    /// Already on when inspected; left alone
    AlreadyActive,

    /// Clicked earlier in this run; never clicked twice
    AlreadyActivated,
}

/// Prerequisites clicked during one run
#[derive(Debug, Clone, Default)]
pub struct ActivatedSet {
    keys: HashSet<PrerequisiteKey>,
}

impl ActivatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &PrerequisiteKey) -> bool {
        self.keys.contains(key)
    }

    pub(crate) fn record(&mut self, key: PrerequisiteKey) {
        self.keys.insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

/// Polling schedule for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub attempts: u32,
}

impl PollBudget {
    pub fn for_kind(policy: &GatePolicy, kind: PrerequisiteKind) -> Self {
        let attempts = match kind {
            PrerequisiteKind::Toggle => policy.toggle_attempts,
            PrerequisiteKind::Tab => policy.tab_attempts,
        };
        Self {
            interval: policy.poll_interval(),
            attempts,
        }
    }

    /// Longest the wait can take
    pub fn total(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// Result of a bounded readiness wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32, last_reason: Option<String> },
}

impl GateOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateOutcome::Ready { .. })
    }
}
