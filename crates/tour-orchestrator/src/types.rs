//! Core types for the tour orchestrator

use serde::{Deserialize, Serialize};
use step_catalog::StepDescriptor;
use tour_core_types::{PageKey, Role, RunId};

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    LoadingCheck,
    Running,
    Paused,
    Closed,
    Skipped,
    Finished,
}

impl Phase {
    /// A run exists and has not ended
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::LoadingCheck | Phase::Running | Phase::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Closed | Phase::Skipped | Phase::Finished)
    }
}

/// User action reported after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Next,
    Prev,
    Close,
    Skip,
}

/// Terminal status reported by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Finished,
    Skipped,
}

/// Events the rendering collaborator reports back.
///
/// Step events carry the index the renderer was showing; events for any
/// index other than the cursor are stale and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    BeforeStep { index: usize },
    AfterStep { index: usize, action: StepAction },
    TargetNotFound { index: usize },
    Status { status: TerminalStatus },
}

/// Everything the renderer needs to paint the tour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub run_id: Option<RunId>,
    pub steps: Vec<StepDescriptor>,
    pub step_index: usize,
    /// False while loading, paused or ended; nothing is shown then
    pub run: bool,
}

/// Rendering collaborator
pub trait RenderSink: Send + Sync {
    fn present(&self, frame: RenderFrame);
}

/// Full page navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, page: PageKey);
}

/// Options for a start request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    /// Begin at the first content step; the welcome was already shown
    pub skip_welcome: bool,
    /// The run is one leg of the multi-page tour. Starts on the chain
    /// entry page always are.
    pub chain: bool,
}

impl StartRequest {
    /// Next leg of a chained tour, entered past its welcome step
    pub fn resume() -> Self {
        Self {
            skip_welcome: true,
            chain: true,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Finished,
    HandedOff { next: PageKey },
    Closed,
    Skipped,
}

/// Payload published on the lifecycle bus for analytics observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TourEvent {
    Started {
        run_id: RunId,
        page: PageKey,
        steps: usize,
        custom: bool,
    },
    PhaseChanged {
        run_id: RunId,
        from: Phase,
        to: Phase,
        cursor: usize,
    },
    StepPatched {
        run_id: RunId,
        index: usize,
        reason: String,
    },
    Ended {
        run_id: RunId,
        page: PageKey,
        outcome: Outcome,
        at_step: usize,
    },
}

/// Read-only view of the orchestrator state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourSnapshot {
    pub page: PageKey,
    pub role: Role,
    pub run_id: Option<RunId>,
    pub phase: Phase,
    pub cursor: usize,
    pub steps: usize,
    pub patched: Vec<usize>,
    pub using_custom_catalog: bool,
    /// The run hands off to the next page when it finishes
    pub chained: bool,
    pub wait_pending: bool,
}
