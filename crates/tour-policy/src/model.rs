use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TourPolicy {
    pub rev: u64,
    pub preflight: PreflightPolicy,
    pub gates: GatePolicy,
    pub continuation: ContinuationPolicy,
    pub features: TourFeatures,
    #[serde(default, skip_serializing)]
    pub provenance: HashMap<String, PolicyProvenance>,
}

/// Up-front sweep over the whole catalog before the first step shows
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PreflightPolicy {
    pub budget_ms: u64,
    pub poll_interval_ms: u64,
}

/// Polling after a prerequisite control is activated
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GatePolicy {
    pub poll_interval_ms: u64,
    pub toggle_attempts: u32,
    pub tab_attempts: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ContinuationPolicy {
    pub validity_window_ms: u64,
    pub storage_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TourFeatures {
    /// Start the tour on the chain entry page for users who never saw it
    pub auto_start: bool,
    /// Hand finished legs to the next page instead of completing
    pub chain: bool,
}

impl PreflightPolicy {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl GatePolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File,
    Env,
    Cli,
    RuntimeOverride,
}

impl TourPolicy {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<PolicySource> {
        self.provenance.get(path).map(|entry| entry.source)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeOverrideSpec {
    pub path: String,
    pub value: serde_json::Value,
    pub owner: String,
    pub reason: String,
    pub ttl_seconds: u64,
}
