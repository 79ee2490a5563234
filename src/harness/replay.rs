//! Scenario replay against the in-memory render tree.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::sleep;
use tour_core_types::{Clock, ManualClock, PageKey, TourError};
use tour_event_bus::{EventBus, InMemoryBus};
use tour_orchestrator::{
    LifecycleEvent, MountDecision, Phase, PreferenceCall, PreferenceService, StepAction,
    TourDeps, TourEvent, TourOrchestrator, TourSnapshot,
};
use tour_policy::{
    InMemoryPolicyCenter, PolicyCenter, PolicyError, RuntimeOverrideSpec, TourPolicy,
};
use tour_readiness::MemoryRenderTree;
use tour_session_store::SessionStore;
use tracing::{debug, info, warn};

use super::adapters::{RecordingNavigator, ScriptedPreferences, TracingSink};
use super::scenario::{Action, Expectation, MountExpectation, PageScript, Scenario, ScenarioError};

const EVENT_CAPACITY: usize = 1024;
const PAUSE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("tour: {0}")]
    Tour(#[from] TourError),
}

pub struct ReplayOptions {
    pub policy: TourPolicy,
    pub store: Arc<dyn SessionStore>,
    /// Real preference service to forward recorded calls to
    pub upstream: Option<Arc<dyn PreferenceService>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page: PageKey,
    pub decision: Option<MountDecision>,
    pub frames: usize,
    pub last_frame_running: bool,
    pub snapshot: TourSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub scenario: String,
    pub pages: Vec<PageReport>,
    pub preference_calls: Vec<PreferenceCall>,
    pub navigations: Vec<PageKey>,
    pub events: Vec<TourEvent>,
}

struct Session {
    center: InMemoryPolicyCenter,
    clock: Arc<ManualClock>,
    prefs: Arc<ScriptedPreferences>,
    navigator: Arc<RecordingNavigator>,
    bus: Arc<InMemoryBus<TourEvent>>,
    store: Arc<dyn SessionStore>,
}

pub async fn replay(
    scenario: &Scenario,
    options: ReplayOptions,
) -> Result<ReplayReport, ReplayError> {
    let center = InMemoryPolicyCenter::new(options.policy);
    for (path, value) in &scenario.overrides {
        center
            .apply_override(RuntimeOverrideSpec {
                path: path.clone(),
                value: value.clone(),
                owner: "scenario".into(),
                reason: format!("scenario {}", scenario.name),
                ttl_seconds: 0,
            })
            .await?;
    }

    let start = scenario
        .start_millis
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let mut prefs = ScriptedPreferences::new(scenario.status);
    if let Some(upstream) = options.upstream {
        prefs = prefs.forwarding_to(upstream);
    }
    let session = Session {
        center,
        clock: Arc::new(ManualClock::new(start)),
        prefs: Arc::new(prefs),
        navigator: Arc::new(RecordingNavigator::default()),
        bus: InMemoryBus::new(EVENT_CAPACITY),
        store: options.store,
    };
    let mut events_rx = session.bus.subscribe();

    info!(scenario = %scenario.name, pages = scenario.pages.len(), "replay started");
    let mut pages = Vec::with_capacity(scenario.pages.len());
    for (load, script) in scenario.pages.iter().enumerate() {
        if load > 0 && session.navigator.last() != Some(script.page) {
            warn!(page = %script.page, "page loaded without a hand-off to it");
        }
        pages.push(replay_page(scenario, script, &session).await?);
    }
    // Preference reports run on spawned tasks.
    tokio::task::yield_now().await;

    let mut events = Vec::new();
    loop {
        match events_rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(missed)) => warn!(missed, "lifecycle events lost"),
            Err(_) => break,
        }
    }

    info!(scenario = %scenario.name, "replay finished");
    Ok(ReplayReport {
        scenario: scenario.name.clone(),
        pages,
        preference_calls: session.prefs.calls(),
        navigations: session.navigator.visits(),
        events,
    })
}

async fn replay_page(
    scenario: &Scenario,
    script: &PageScript,
    session: &Session,
) -> Result<PageReport, ReplayError> {
    let page = script.page;
    let tree = MemoryRenderTree::new();
    for node in &script.nodes {
        tree.insert(node.clone());
    }
    for control in &script.controls {
        tree.add_control(control.clone());
    }
    let sink = TracingSink::new(page);
    let deps = TourDeps {
        tree: tree.clone(),
        controls: tree.clone(),
        renderer: sink.clone(),
        preferences: session.prefs.clone(),
        store: session.store.clone(),
        navigator: session.navigator.clone(),
        clock: session.clock.clone(),
        events: Some(session.bus.clone()),
    };
    let role = script.role.unwrap_or(scenario.role);
    let tour = TourOrchestrator::new(page, role, deps, session.center.subscribe())?;
    info!(%page, %role, now = session.clock.now_millis(), "page mounted");

    let decision = if script.mount {
        let decision = tour.on_mount().await;
        info!(%page, ?decision, "mount decision");
        if let Some(expected) = script.expect_mount {
            if !mount_matches(expected, &decision) {
                return Err(ScenarioError::Expectation {
                    page,
                    index: 0,
                    detail: format!("mount decision {decision:?}, expected {expected:?}"),
                }
                .into());
            }
        }
        Some(decision)
    } else {
        None
    };

    for (index, action) in script.actions.iter().enumerate() {
        debug!(%page, index, ?action, "action");
        match action {
            Action::Start(request) => {
                tour.start(*request);
            }
            Action::Event(event) => tour.handle_event(event.clone()),
            Action::Walk(count) => walk(&tour, *count).await,
            Action::Wait(ms) => sleep(Duration::from_millis(*ms)).await,
            Action::Clock(ms) => session.clock.advance(*ms),
            Action::Close => tour.close(),
            Action::Skip => tour.skip(),
            Action::Finish => tour.finish(),
            Action::SetRole(role) => tour.set_role(*role)?,
            Action::Insert(node) => tree.insert(node.clone()),
            Action::Remove(id) => tree.remove(id),
            Action::Expect(expectation) => {
                check(&tour.snapshot(), expectation).map_err(|detail| {
                    ScenarioError::Expectation {
                        page,
                        index,
                        detail,
                    }
                })?;
            }
        }
        tokio::task::yield_now().await;
    }

    Ok(PageReport {
        page,
        decision,
        frames: sink.count(),
        last_frame_running: sink.last().map(|frame| frame.run).unwrap_or(false),
        snapshot: tour.snapshot(),
    })
}

/// Show and confirm steps the way a user clicking "next" would, waiting
/// out any dependency pause before confirming.
async fn walk(tour: &TourOrchestrator, count: usize) {
    for _ in 0..count {
        let snapshot = tour.snapshot();
        if snapshot.phase != Phase::Running {
            warn!(phase = ?snapshot.phase, "walk stopped, run is not showing a step");
            return;
        }
        let index = snapshot.cursor;
        tour.handle_event(LifecycleEvent::BeforeStep { index });
        while tour.snapshot().phase == Phase::Paused {
            sleep(PAUSE_POLL).await;
        }
        tour.handle_event(LifecycleEvent::AfterStep {
            index,
            action: StepAction::Next,
        });
        tokio::task::yield_now().await;
    }
}

fn mount_matches(expected: MountExpectation, decision: &MountDecision) -> bool {
    matches!(
        (expected, decision),
        (MountExpectation::Resume, MountDecision::Resume { .. })
            | (MountExpectation::AutoStart, MountDecision::AutoStart)
            | (MountExpectation::Stay, MountDecision::Stay)
    )
}

fn check(snapshot: &TourSnapshot, expected: &Expectation) -> Result<(), String> {
    if let Some(phase) = expected.phase {
        if snapshot.phase != phase {
            return Err(format!("phase {:?}, expected {:?}", snapshot.phase, phase));
        }
    }
    if let Some(cursor) = expected.cursor {
        if snapshot.cursor != cursor {
            return Err(format!("cursor {}, expected {}", snapshot.cursor, cursor));
        }
    }
    if let Some(patched) = &expected.patched {
        if &snapshot.patched != patched {
            return Err(format!("patched {:?}, expected {:?}", snapshot.patched, patched));
        }
    }
    if let Some(steps) = expected.steps {
        if snapshot.steps != steps {
            return Err(format!("{} steps, expected {}", snapshot.steps, steps));
        }
    }
    Ok(())
}
