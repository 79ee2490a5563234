#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tour_core_types::{ManualClock, PageKey, Role};
use tour_event_bus::InMemoryBus;
use tour_orchestrator::{
    Navigator, OnboardingStatus, PreferenceCall, PreferenceError, PreferenceService, RenderFrame,
    RenderSink, TourDeps, TourEvent, TourOrchestrator,
};
use tour_policy::{default_policy, fixed_policy, TourPolicy};
use tour_readiness::{MemoryRenderTree, NodeSpec};
use tour_session_store::InMemorySessionStore;

pub const T0: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<RenderFrame>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<RenderFrame> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<RenderFrame> {
        self.frames.lock().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }
}

impl RenderSink for RecordingSink {
    fn present(&self, frame: RenderFrame) {
        self.frames.lock().push(frame);
    }
}

#[derive(Default)]
pub struct RecordingPreferences {
    calls: Mutex<Vec<PreferenceCall>>,
    status: Mutex<OnboardingStatus>,
    failing: Mutex<bool>,
}

impl RecordingPreferences {
    pub fn calls(&self) -> Vec<PreferenceCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: PreferenceCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn set_status(&self, status: OnboardingStatus) {
        *self.status.lock() = status;
    }

    pub fn fail_everything(&self) {
        *self.failing.lock() = true;
    }

    fn record(&self, call: PreferenceCall) -> Result<(), PreferenceError> {
        self.calls.lock().push(call);
        if *self.failing.lock() {
            return Err(PreferenceError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceService for RecordingPreferences {
    async fn mark_completed(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::Completed)
    }

    async fn mark_never_show(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::NeverShow)
    }

    async fn mark_skipped(&self) -> Result<(), PreferenceError> {
        self.record(PreferenceCall::Skipped)
    }

    async fn status(&self) -> Result<OnboardingStatus, PreferenceError> {
        if *self.failing.lock() {
            return Err(PreferenceError::Transport("offline".into()));
        }
        Ok(*self.status.lock())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<PageKey>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<PageKey> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, page: PageKey) {
        self.visits.lock().push(page);
    }
}

/// One browser session: shared storage, clock and preference backend.
/// Every orchestrator built from it gets its own render tree and sink.
pub struct Session {
    pub prefs: Arc<RecordingPreferences>,
    pub store: Arc<InMemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<InMemoryBus<TourEvent>>,
}

pub struct Page {
    pub tree: Arc<MemoryRenderTree>,
    pub sink: Arc<RecordingSink>,
    pub tour: TourOrchestrator,
}

impl Session {
    pub fn new() -> Self {
        Self {
            prefs: Arc::new(RecordingPreferences::default()),
            store: InMemorySessionStore::new(),
            navigator: Arc::new(RecordingNavigator::default()),
            clock: Arc::new(ManualClock::new(T0)),
            bus: InMemoryBus::new(256),
        }
    }

    pub fn mount(&self, page: PageKey, role: Role) -> Page {
        self.mount_with(page, role, default_policy())
    }

    pub fn mount_with(&self, page: PageKey, role: Role, policy: TourPolicy) -> Page {
        let tree = MemoryRenderTree::new();
        let sink = Arc::new(RecordingSink::default());
        let deps = TourDeps {
            tree: tree.clone(),
            controls: tree.clone(),
            renderer: sink.clone(),
            preferences: self.prefs.clone(),
            store: self.store.clone(),
            navigator: self.navigator.clone(),
            clock: self.clock.clone(),
            events: Some(self.bus.clone()),
        };
        let tour = TourOrchestrator::new(page, role, deps, fixed_policy(policy)).unwrap();
        Page { tree, sink, tour }
    }
}

impl Page {
    /// Insert one visible node per selector
    pub fn render(&self, selectors: &[&str]) {
        for (i, selector) in selectors.iter().enumerate() {
            self.tree
                .insert(NodeSpec::new(&format!("node-{i}-{selector}"), selector));
        }
    }
}

/// Lets spawned waits and preference calls run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
