//! Tour orchestrator state machine
//!
//! `Idle -> LoadingCheck -> Running <-> Paused -> {Closed | Skipped | Finished}`
//!
//! All state lives behind one lock. Waits (the pre-flight sweep and the
//! post-activation poll) run as spawned tasks; at most one is pending per
//! run, and each re-validates run id, wait sequence and phase under the lock
//! before acting. Collaborator calls are collected as effects while the lock
//! is held and executed after it is released.

use std::sync::Arc;

use dependency_gate::{ActivatedSet, DependencyResolver, GateError, GateOutcome, PollBudget};
use parking_lot::Mutex;
use step_catalog::{
    build_catalog, Catalog, GateTable, PrerequisiteKey, StepCatalog, Target, WorkingView,
};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tour_core_types::{Clock, PageKey, Role, RunId, TourError};
use tour_event_bus::InMemoryBus;
use tour_policy::TourPolicy;
use tour_readiness::{ControlPort, ReadinessDetector, RenderTree};
use tour_session_store::SessionStore;
use tracing::{debug, info, warn};

use crate::continuation::{chain_next, ContinuationCoordinator, MountDecision, CHAIN_ENTRY};
use crate::fallback::apply_fallback;
use crate::preferences::{PreferenceCall, PreferenceReporter, PreferenceService};
use crate::types::{
    LifecycleEvent, Navigator, Outcome, Phase, RenderFrame, RenderSink, StartRequest, StepAction,
    TerminalStatus, TourEvent, TourSnapshot,
};

/// Collaborators the orchestrator drives
pub struct TourDeps {
    pub tree: Arc<dyn RenderTree>,
    pub controls: Arc<dyn ControlPort>,
    pub renderer: Arc<dyn RenderSink>,
    pub preferences: Arc<dyn PreferenceService>,
    pub store: Arc<dyn SessionStore>,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
    pub events: Option<Arc<InMemoryBus<TourEvent>>>,
}

#[derive(Clone)]
pub struct TourOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    page: PageKey,
    detector: Arc<ReadinessDetector>,
    resolver: DependencyResolver,
    renderer: Arc<dyn RenderSink>,
    reporter: PreferenceReporter,
    continuation: ContinuationCoordinator,
    events: Option<Arc<InMemoryBus<TourEvent>>>,
    policy: watch::Receiver<Arc<TourPolicy>>,
    state: Mutex<TourState>,
}

struct TourState {
    role: Role,
    catalog: Catalog,
    /// Role changed while a run was live; rebuild before the next start
    role_pending: bool,
    run: TourRun,
}

struct PendingWait {
    seq: u64,
    cancel: CancellationToken,
}

struct TourRun {
    run_id: Option<RunId>,
    view: WorkingView,
    cursor: usize,
    phase: Phase,
    custom: bool,
    chained: bool,
    activated: ActivatedSet,
    wait: Option<PendingWait>,
    wait_seq: u64,
}

enum Effect {
    Present(RenderFrame),
    Publish(TourEvent),
    Report(PreferenceCall),
    ClearContinuation,
    HandOff {
        next: PageKey,
        run_id: RunId,
        at_step: usize,
    },
}

struct GateWait {
    run_id: RunId,
    seq: u64,
    cancel: CancellationToken,
    index: usize,
    target: Target,
    key: PrerequisiteKey,
    budget: PollBudget,
}

impl TourRun {
    fn idle(catalog: &Catalog) -> Self {
        Self {
            run_id: None,
            view: WorkingView::new(Arc::clone(catalog.steps())),
            cursor: 0,
            phase: Phase::Idle,
            custom: catalog.is_custom(),
            chained: false,
            activated: ActivatedSet::new(),
            wait: None,
            wait_seq: 0,
        }
    }

    fn frame(&self, run: bool) -> RenderFrame {
        RenderFrame {
            run_id: self.run_id,
            steps: self.view.compose(),
            step_index: self.cursor,
            run,
        }
    }

    fn set_phase(&mut self, to: Phase, effects: &mut Vec<Effect>) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        if let Some(run_id) = self.run_id {
            info!(%run_id, ?from, ?to, cursor = self.cursor, "tour phase changed");
            effects.push(Effect::Publish(TourEvent::PhaseChanged {
                run_id,
                from,
                to,
                cursor: self.cursor,
            }));
        }
    }

    /// Arms a new wait, cancelling the previous one
    fn arm_wait(&mut self) -> (u64, CancellationToken) {
        self.cancel_wait();
        self.wait_seq += 1;
        let cancel = CancellationToken::new();
        self.wait = Some(PendingWait {
            seq: self.wait_seq,
            cancel: cancel.clone(),
        });
        (self.wait_seq, cancel)
    }

    fn cancel_wait(&mut self) {
        if let Some(wait) = self.wait.take() {
            wait.cancel.cancel();
        }
    }

    fn owns_wait(&self, run_id: RunId, seq: u64) -> bool {
        self.run_id == Some(run_id) && self.wait.as_ref().map(|w| w.seq) == Some(seq)
    }

    fn fallback(&mut self, index: usize, reason: &str, effects: &mut Vec<Effect>) -> bool {
        if !apply_fallback(&mut self.view, index) {
            return false;
        }
        if let Some(run_id) = self.run_id {
            warn!(%run_id, index, reason, "step replaced by whole-screen fallback");
            effects.push(Effect::Publish(TourEvent::StepPatched {
                run_id,
                index,
                reason: reason.to_string(),
            }));
        }
        true
    }

    /// Pre-apply a fallback to the step under the cursor when it is already
    /// known to be unready. Toggle-gated steps are left to the pre-step
    /// handling; tab-gated ones are deferred by the detector.
    fn precheck(&mut self, detector: &ReadinessDetector, effects: &mut Vec<Effect>) {
        let index = self.cursor;
        let reason = {
            let Some(step) = self.view.step(index) else {
                return;
            };
            let gates = self.view.catalog().gates();
            if awaits_toggle(gates, step.target()) {
                return;
            }
            let readiness = detector.check(step.target(), gates);
            if readiness.ready {
                return;
            }
            readiness.reason.unwrap_or_else(|| "not_ready".to_string())
        };
        self.fallback(index, &reason, effects);
    }
}

/// Gated by a prerequisite other than a tab switch
fn awaits_toggle(gates: &GateTable, target: &Target) -> bool {
    gates.gate_for(target).is_some() && !gates.is_deferred(target)
}

impl TourOrchestrator {
    /// Orchestrator for one page instance, starting from the role's catalog
    pub fn new(
        page: PageKey,
        role: Role,
        deps: TourDeps,
        policy: watch::Receiver<Arc<TourPolicy>>,
    ) -> Result<Self, TourError> {
        let catalog = Catalog::Base(Arc::new(build_catalog(page, role)?));
        let detector = Arc::new(ReadinessDetector::new(deps.tree));
        let resolver = DependencyResolver::new(Arc::clone(&detector), deps.controls);
        let continuation = ContinuationCoordinator::new(deps.store, deps.navigator, deps.clock);
        let run = TourRun::idle(&catalog);

        Ok(Self {
            inner: Arc::new(Inner {
                page,
                detector,
                resolver,
                renderer: deps.renderer,
                reporter: PreferenceReporter::new(deps.preferences),
                continuation,
                events: deps.events,
                policy,
                state: Mutex::new(TourState {
                    role,
                    catalog,
                    role_pending: false,
                    run,
                }),
            }),
        })
    }

    pub fn page(&self) -> PageKey {
        self.inner.page
    }

    fn policy(&self) -> Arc<TourPolicy> {
        Arc::clone(&self.inner.policy.borrow())
    }

    pub fn snapshot(&self) -> TourSnapshot {
        let state = self.inner.state.lock();
        let run = &state.run;
        TourSnapshot {
            page: self.inner.page,
            role: state.role,
            run_id: run.run_id,
            phase: run.phase,
            cursor: run.cursor,
            steps: run.view.len(),
            patched: run.view.patches().indices().collect(),
            using_custom_catalog: state.catalog.is_custom(),
            chained: run.chained,
            wait_pending: run.wait.is_some(),
        }
    }

    /// Frame reflecting the current state, as last presented
    pub fn current_frame(&self) -> RenderFrame {
        let state = self.inner.state.lock();
        let run = &state.run;
        run.frame(run.phase == Phase::Running)
    }

    /// Start a run. A live run is reset first; there is never more than one.
    pub fn start(&self, request: StartRequest) -> RunId {
        let mut effects = Vec::new();
        let run_id = RunId::new();
        let (seq, cancel) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.run.phase.is_live() {
                warn!(
                    page = %self.inner.page,
                    previous = ?state.run.run_id,
                    phase = ?state.run.phase,
                    "start requested while a run is live; resetting"
                );
                state.run.cancel_wait();
            }
            if state.role_pending && !state.catalog.is_custom() {
                self.rebuild_base(state);
            }
            state.role_pending = false;

            let wait_seq = state.run.wait_seq;
            state.run = TourRun::idle(&state.catalog);
            state.run.wait_seq = wait_seq;
            state.run.run_id = Some(run_id);
            state.run.chained = request.chain || self.inner.page == CHAIN_ENTRY;

            info!(
                page = %self.inner.page,
                %run_id,
                steps = state.run.view.len(),
                custom = state.run.custom,
                skip_welcome = request.skip_welcome,
                chained = state.run.chained,
                "tour run started"
            );
            effects.push(Effect::Publish(TourEvent::Started {
                run_id,
                page: self.inner.page,
                steps: state.run.view.len(),
                custom: state.run.custom,
            }));
            state.run.set_phase(Phase::LoadingCheck, &mut effects);
            effects.push(Effect::Present(state.run.frame(false)));
            state.run.arm_wait()
        };
        self.apply(effects);
        self.spawn_preflight(run_id, seq, cancel, request.skip_welcome);
        run_id
    }

    fn spawn_preflight(
        &self,
        run_id: RunId,
        seq: u64,
        cancel: CancellationToken,
        skip_welcome: bool,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            let policy = this.policy();
            let deadline = Instant::now() + policy.preflight.budget();
            loop {
                let Some(pending) = this.preflight_pass(run_id, seq) else {
                    return;
                };
                let now = Instant::now();
                if pending.is_empty() || now >= deadline {
                    this.finish_preflight(run_id, seq, pending, skip_welcome);
                    return;
                }
                let pause = policy.preflight.poll_interval().min(deadline - now);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = sleep(pause) => {}
                }
            }
        });
    }

    /// Indices of steps that are not ready yet, with their reasons. Steps
    /// behind a toggle are skipped until their pre-step.
    /// `None` when the sweep no longer belongs to the current run.
    fn preflight_pass(&self, run_id: RunId, seq: u64) -> Option<Vec<(usize, String)>> {
        let state = self.inner.state.lock();
        let run = &state.run;
        if !run.owns_wait(run_id, seq) || run.phase != Phase::LoadingCheck {
            return None;
        }
        let gates = run.view.catalog().gates();
        let pending: Vec<(usize, String)> = (0..run.view.len())
            .filter_map(|index| {
                let step = run.view.step(index)?;
                if awaits_toggle(gates, step.target()) {
                    return None;
                }
                let readiness = self.inner.detector.check(step.target(), gates);
                (!readiness.ready).then(|| {
                    (
                        index,
                        readiness.reason.unwrap_or_else(|| "not_ready".to_string()),
                    )
                })
            })
            .collect();
        debug!(%run_id, pending = pending.len(), "pre-flight sweep");
        Some(pending)
    }

    fn finish_preflight(
        &self,
        run_id: RunId,
        seq: u64,
        unready: Vec<(usize, String)>,
        skip_welcome: bool,
    ) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if !run.owns_wait(run_id, seq) || run.phase != Phase::LoadingCheck {
                return;
            }
            run.wait = None;
            for (index, reason) in unready {
                run.fallback(index, &format!("preflight budget exhausted: {reason}"), &mut effects);
            }
            run.cursor = if skip_welcome {
                run.view.catalog().first_content_index()
            } else {
                0
            };
            run.set_phase(Phase::Running, &mut effects);
            effects.push(Effect::Present(run.frame(true)));
        }
        self.apply(effects);
    }

    /// React to an event from the rendering collaborator
    pub fn handle_event(&self, event: LifecycleEvent) {
        debug!(page = %self.inner.page, ?event, "lifecycle event");
        match event {
            LifecycleEvent::BeforeStep { index } => self.before_step(index),
            LifecycleEvent::AfterStep { index, action } => match action {
                StepAction::Next => self.next(index),
                StepAction::Prev => self.prev(index),
                StepAction::Close => self.close(),
                StepAction::Skip => self.skip(),
            },
            LifecycleEvent::TargetNotFound { index } => self.recover(index),
            LifecycleEvent::Status { status } => match status {
                TerminalStatus::Finished => self.finish(),
                TerminalStatus::Skipped => self.skip(),
            },
        }
    }

    fn before_step(&self, index: usize) {
        let policy = self.policy();
        let mut effects = Vec::new();
        let mut gate_wait = None;
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if run.phase != Phase::Running || run.cursor != index {
                debug!(index, cursor = run.cursor, phase = ?run.phase, "stale pre-step event ignored");
                return;
            }
            let Some(run_id) = run.run_id else {
                return;
            };
            let Some(step) = run.view.step(index) else {
                return;
            };
            let target = step.target().clone();
            let prerequisite = run.view.catalog().gates().gate_for(&target).cloned();

            match prerequisite {
                Some(prerequisite) => {
                    run.set_phase(Phase::Paused, &mut effects);
                    match self
                        .inner
                        .resolver
                        .ensure_active(&prerequisite, &mut run.activated)
                    {
                        Ok(activation) => {
                            debug!(key = %prerequisite.key, ?activation, "prerequisite checked");
                            let readiness = self.inner.detector.measure(&target);
                            if readiness.ready {
                                run.set_phase(Phase::Running, &mut effects);
                            } else {
                                effects.push(Effect::Present(run.frame(false)));
                                let (seq, cancel) = run.arm_wait();
                                gate_wait = Some(GateWait {
                                    run_id,
                                    seq,
                                    cancel,
                                    index,
                                    target,
                                    key: prerequisite.key.clone(),
                                    budget: PollBudget::for_kind(&policy.gates, prerequisite.kind),
                                });
                            }
                        }
                        Err(err) => {
                            warn!(
                                key = %prerequisite.key,
                                severity = err.severity(),
                                "prerequisite unavailable: {err}"
                            );
                            run.fallback(index, &err.to_string(), &mut effects);
                            run.set_phase(Phase::Running, &mut effects);
                            effects.push(Effect::Present(run.frame(true)));
                        }
                    }
                }
                None => {
                    let readiness = self.inner.detector.measure(&target);
                    if !readiness.ready {
                        let reason = readiness.reason.unwrap_or_else(|| "not_ready".to_string());
                        if run.fallback(index, &reason, &mut effects) {
                            effects.push(Effect::Present(run.frame(true)));
                        }
                    }
                }
            }
        }
        self.apply(effects);
        if let Some(wait) = gate_wait {
            self.spawn_gate_wait(wait);
        }
    }

    fn spawn_gate_wait(&self, wait: GateWait) {
        let this = self.clone();
        tokio::spawn(async move {
            debug!(
                key = %wait.key,
                attempts = wait.budget.attempts,
                "waiting for gated target"
            );
            let outcome = this
                .inner
                .resolver
                .wait_ready(&wait.target, wait.budget, &wait.cancel)
                .await;
            this.complete_gate_wait(wait.run_id, wait.seq, wait.index, outcome);
        });
    }

    fn complete_gate_wait(
        &self,
        run_id: RunId,
        seq: u64,
        index: usize,
        outcome: Result<GateOutcome, GateError>,
    ) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if !run.owns_wait(run_id, seq) || run.phase != Phase::Paused || run.cursor != index {
                debug!(%run_id, seq, "stale gate wait ignored");
                return;
            }
            run.wait = None;
            match outcome {
                Ok(GateOutcome::Ready { attempts }) => {
                    info!(%run_id, index, attempts, "gated step ready; resuming");
                }
                Ok(GateOutcome::TimedOut { attempts, last_reason }) => {
                    let reason = format!(
                        "dependency timeout after {attempts} attempts: {}",
                        last_reason.as_deref().unwrap_or("not_ready")
                    );
                    run.fallback(index, &reason, &mut effects);
                }
                Err(GateError::Cancelled) => return,
                Err(err) => {
                    run.fallback(index, &err.to_string(), &mut effects);
                }
            }
            run.set_phase(Phase::Running, &mut effects);
            effects.push(Effect::Present(run.frame(true)));
        }
        self.apply(effects);
    }

    fn next(&self, index: usize) {
        let mut effects = Vec::new();
        let finished = {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if run.phase != Phase::Running || run.cursor != index {
                debug!(index, cursor = run.cursor, "stale next ignored");
                return;
            }
            if run.cursor + 1 >= run.view.len() {
                true
            } else {
                run.cursor += 1;
                run.precheck(&self.inner.detector, &mut effects);
                effects.push(Effect::Present(run.frame(true)));
                false
            }
        };
        self.apply(effects);
        if finished {
            self.finish();
        }
    }

    fn prev(&self, index: usize) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if run.phase != Phase::Running || run.cursor != index || run.cursor == 0 {
                debug!(index, cursor = run.cursor, "prev ignored");
                return;
            }
            run.cursor -= 1;
            run.precheck(&self.inner.detector, &mut effects);
            effects.push(Effect::Present(run.frame(true)));
        }
        self.apply(effects);
    }

    /// The renderer could not locate the current target: pause, patch the
    /// step, resume at the same index.
    fn recover(&self, index: usize) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if run.phase != Phase::Running || run.cursor != index {
                debug!(index, cursor = run.cursor, "stale target-not-found ignored");
                return;
            }
            run.set_phase(Phase::Paused, &mut effects);
            run.fallback(index, "renderer could not locate target", &mut effects);
            run.set_phase(Phase::Running, &mut effects);
            effects.push(Effect::Present(run.frame(true)));
        }
        self.apply(effects);
    }

    pub fn close(&self) {
        self.end(Phase::Closed);
    }

    pub fn skip(&self) {
        self.end(Phase::Skipped);
    }

    pub fn finish(&self) {
        self.end(Phase::Finished);
    }

    fn end(&self, terminal: Phase) {
        let policy = self.policy();
        let page = self.inner.page;
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let run = &mut state.run;
            if !run.phase.is_live() {
                debug!(phase = ?run.phase, ?terminal, "no live run to end");
                return;
            }
            let Some(run_id) = run.run_id else {
                return;
            };
            let at_step = run.cursor;
            let chained = run.chained && !run.custom;
            run.cancel_wait();
            run.set_phase(terminal, &mut effects);
            run.cursor = 0;
            run.view.clear_patches();
            run.activated.clear();

            let outcome = match terminal {
                Phase::Closed => {
                    effects.push(Effect::ClearContinuation);
                    effects.push(Effect::Report(PreferenceCall::NeverShow));
                    Some(Outcome::Closed)
                }
                Phase::Skipped => {
                    effects.push(Effect::ClearContinuation);
                    effects.push(Effect::Report(PreferenceCall::NeverShow));
                    effects.push(Effect::Report(PreferenceCall::Skipped));
                    Some(Outcome::Skipped)
                }
                _ => match chain_next(page) {
                    Some(next) if policy.features.chain && chained => {
                        effects.push(Effect::HandOff {
                            next,
                            run_id,
                            at_step,
                        });
                        None
                    }
                    _ => {
                        effects.push(Effect::Report(PreferenceCall::Completed));
                        Some(Outcome::Finished)
                    }
                },
            };
            if let Some(outcome) = outcome {
                effects.push(Effect::Publish(TourEvent::Ended {
                    run_id,
                    page,
                    outcome,
                    at_step,
                }));
            }
            effects.push(Effect::Present(run.frame(false)));
        }
        self.apply(effects);
    }

    /// Switch the role. Only a base catalog is rebuilt, and never under a
    /// live run; the rebuild then waits for the next start.
    pub fn set_role(&self, role: Role) -> Result<(), TourError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.role == role {
            return Ok(());
        }
        state.role = role;
        if state.catalog.is_custom() {
            debug!(%role, "role changed; custom catalog kept");
            return Ok(());
        }
        if state.run.phase.is_live() {
            debug!(%role, "role changed during a live run; rebuild deferred");
            state.role_pending = true;
            return Ok(());
        }
        let catalog = build_catalog(self.inner.page, role)?;
        state.catalog = Catalog::Base(Arc::new(catalog));
        state.run.view = WorkingView::new(Arc::clone(state.catalog.steps()));
        state.run.custom = false;
        info!(%role, page = %self.inner.page, "catalog rebuilt for role");
        Ok(())
    }

    /// Use a caller-supplied catalog for this and later starts. A live run
    /// keeps the catalog it started with.
    pub fn set_custom_catalog(&self, catalog: StepCatalog) -> Result<(), TourError> {
        catalog.validate()?;
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.catalog = Catalog::Custom(Arc::new(catalog));
        if !state.run.phase.is_live() {
            state.run.view = WorkingView::new(Arc::clone(state.catalog.steps()));
            state.run.custom = true;
        }
        info!(page = %self.inner.page, steps = state.catalog.steps().len(), "custom catalog installed");
        Ok(())
    }

    /// Return to the role-derived catalog
    pub fn clear_custom_catalog(&self) -> Result<(), TourError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if !state.catalog.is_custom() {
            return Ok(());
        }
        let catalog = build_catalog(self.inner.page, state.role)?;
        state.catalog = Catalog::Base(Arc::new(catalog));
        state.role_pending = false;
        if !state.run.phase.is_live() {
            state.run.view = WorkingView::new(Arc::clone(state.catalog.steps()));
            state.run.custom = false;
        }
        Ok(())
    }

    fn rebuild_base(&self, state: &mut TourState) {
        match build_catalog(self.inner.page, state.role) {
            Ok(catalog) => {
                state.catalog = Catalog::Base(Arc::new(catalog));
                info!(role = %state.role, page = %self.inner.page, "deferred catalog rebuild applied");
            }
            Err(err) => warn!(role = %state.role, "catalog rebuild failed, keeping previous: {err}"),
        }
    }

    /// Mount-time decision: resume from a fresh intent, auto-start a first
    /// visit on the chain entry page, or stay idle.
    pub async fn on_mount(&self) -> MountDecision {
        let policy = self.policy();
        let page = self.inner.page;
        if let Some(intent) = self.inner.continuation.consume(page, &policy.continuation) {
            info!(%page, "resuming chained tour");
            self.start(StartRequest::resume());
            return MountDecision::Resume { intent };
        }
        if page != CHAIN_ENTRY || !policy.features.auto_start {
            return MountDecision::Stay;
        }
        match self.inner.reporter.service().status().await {
            Ok(status) if status.should_auto_start() => {
                info!(%page, "auto-starting tour for first visit");
                self.start(StartRequest::default());
                MountDecision::AutoStart
            }
            Ok(_) => MountDecision::Stay,
            Err(err) => {
                warn!(%page, "onboarding status unavailable: {err}");
                MountDecision::Stay
            }
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Present(frame) => self.inner.renderer.present(frame),
                Effect::Publish(event) => self.publish(event),
                Effect::Report(call) => self.inner.reporter.report(call),
                Effect::ClearContinuation => {
                    let policy = self.policy();
                    if let Err(err) = self.inner.continuation.clear(&policy.continuation) {
                        warn!("continuation record not cleared: {err}");
                    }
                }
                Effect::HandOff {
                    next,
                    run_id,
                    at_step,
                } => {
                    let policy = self.policy();
                    let outcome = match self.inner.continuation.hand_off(next, &policy.continuation)
                    {
                        Ok(_) => Outcome::HandedOff { next },
                        Err(err) => {
                            warn!(%next, "hand-off failed, recording completion instead: {err}");
                            self.inner.reporter.report(PreferenceCall::Completed);
                            Outcome::Finished
                        }
                    };
                    self.publish(TourEvent::Ended {
                        run_id,
                        page: self.inner.page,
                        outcome,
                        at_step,
                    });
                }
            }
        }
    }

    fn publish(&self, event: TourEvent) {
        if let Some(bus) = &self.inner.events {
            bus.emit(event);
        }
    }
}
