//! Collaborators the harness plugs into an orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tour_core_types::PageKey;
use tour_orchestrator::{
    Navigator, OnboardingStatus, PreferenceCall, PreferenceError, PreferenceService, RenderFrame,
    RenderSink,
};
use tracing::{info, warn};

/// Logs every frame the orchestrator hands to the renderer.
pub struct TracingSink {
    page: PageKey,
    frames: Mutex<Vec<RenderFrame>>,
}

impl TracingSink {
    pub fn new(page: PageKey) -> Arc<Self> {
        Arc::new(Self {
            page,
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn last(&self) -> Option<RenderFrame> {
        self.frames.lock().last().cloned()
    }
}

impl RenderSink for TracingSink {
    fn present(&self, frame: RenderFrame) {
        let title = frame
            .steps
            .get(frame.step_index)
            .and_then(|step| step.content().get("title"))
            .and_then(|title| title.as_str())
            .unwrap_or_default()
            .to_string();
        let whole_screen = frame
            .steps
            .get(frame.step_index)
            .map(|step| step.is_whole_screen())
            .unwrap_or(false);
        info!(
            page = %self.page,
            run = frame.run,
            step = frame.step_index,
            whole_screen,
            %title,
            "frame"
        );
        self.frames.lock().push(frame);
    }
}

/// Records navigation requests; the replay mounts the next page itself.
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<PageKey>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<PageKey> {
        self.visits.lock().clone()
    }

    pub fn last(&self) -> Option<PageKey> {
        self.visits.lock().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, page: PageKey) {
        info!(%page, "navigation requested");
        self.visits.lock().push(page);
    }
}

/// Preference backend for replays.
///
/// Every call is recorded. With an upstream client the call is forwarded
/// and its failure returned; without one the scripted status is served.
pub struct ScriptedPreferences {
    calls: Mutex<Vec<PreferenceCall>>,
    status: Mutex<OnboardingStatus>,
    upstream: Option<Arc<dyn PreferenceService>>,
}

impl ScriptedPreferences {
    pub fn new(status: OnboardingStatus) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: Mutex::new(status),
            upstream: None,
        }
    }

    pub fn forwarding_to(mut self, upstream: Arc<dyn PreferenceService>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn calls(&self) -> Vec<PreferenceCall> {
        self.calls.lock().clone()
    }

    async fn record(&self, call: PreferenceCall) -> Result<(), PreferenceError> {
        info!(call = call.name(), "preference recorded");
        self.calls.lock().push(call);
        {
            let mut status = self.status.lock();
            match call {
                PreferenceCall::Completed => status.completed = true,
                PreferenceCall::NeverShow => status.never_show = true,
                PreferenceCall::Skipped => {}
            }
        }
        let Some(upstream) = &self.upstream else {
            return Ok(());
        };
        let result = match call {
            PreferenceCall::Completed => upstream.mark_completed().await,
            PreferenceCall::NeverShow => upstream.mark_never_show().await,
            PreferenceCall::Skipped => upstream.mark_skipped().await,
        };
        if let Err(err) = &result {
            warn!(call = call.name(), "upstream preference call failed: {err}");
        }
        result
    }
}

#[async_trait]
impl PreferenceService for ScriptedPreferences {
    async fn mark_completed(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::Completed).await
    }

    async fn mark_never_show(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::NeverShow).await
    }

    async fn mark_skipped(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::Skipped).await
    }

    async fn status(&self) -> Result<OnboardingStatus, PreferenceError> {
        match &self.upstream {
            Some(upstream) => upstream.status().await,
            None => Ok(*self.status.lock()),
        }
    }
}
