mod common;

use common::{advance, settle, Page, Session};
use serde_json::json;
use step_catalog::{GateTable, Placement, StepCatalog, StepDescriptor, TargetSelector};
use tour_core_types::{PageKey, Role};
use tour_event_bus::EventBus;
use tour_orchestrator::{
    LifecycleEvent, MountDecision, OnboardingStatus, Outcome, Phase, PreferenceCall,
    StartRequest, StepAction, TerminalStatus, TourEvent,
};
use tour_readiness::{ControlSpec, NodeSpec};
use tour_session_store::SessionStore;

const BOOKING_TOGGLE: &str = "#format-booking-toggle input[type='checkbox']";

fn render_dashboard(page: &Page) {
    page.render(&[
        "#dashboard-stats",
        "#main-content [data-tour='upcoming-events']",
    ]);
    page.tree
        .insert(NodeSpec::new("nav-cal", "#sidebar [data-tour='nav-calendar']").in_navigation());
}

/// Formats page for an admin; the booking panels appear once the toggle is on
fn formats_page(session: &Session, reveal_after_reflows: u32, reveals: bool) -> Page {
    let page = session.mount(PageKey::Formats, Role::Admin);
    page.render(&["#main-content [data-tour='formats']", "#format-booking-toggle"]);
    page.tree
        .insert(NodeSpec::new("settings", "#format-booking-settings").gated());
    page.tree
        .insert(NodeSpec::new("capacity", "#format-booking-capacity").gated());
    let mut control = ControlSpec::new(BOOKING_TOGGLE).reveal_after_reflows(reveal_after_reflows);
    if reveals {
        control = control.reveals("settings").reveals("capacity");
    }
    page.tree.add_control(control);
    page
}

async fn run_to(page: &Page, cursor: usize) {
    page.tour.start(StartRequest::default());
    settle().await;
    assert_eq!(page.tour.snapshot().phase, Phase::Running);
    for index in 0..cursor {
        page.tour.handle_event(LifecycleEvent::BeforeStep { index });
        page.tour.handle_event(LifecycleEvent::AfterStep {
            index,
            action: StepAction::Next,
        });
    }
    assert_eq!(page.tour.snapshot().cursor, cursor);
}

#[tokio::test(start_paused = true)]
async fn restart_while_live_keeps_a_single_run() {
    let session = Session::new();
    let page = session.mount(PageKey::EventData, Role::Attendee);
    page.tour
        .set_custom_catalog(
            StepCatalog::custom(
                PageKey::EventData,
                vec![StepDescriptor::element(
                    TargetSelector::css("#late-panel"),
                    json!({}),
                    Placement::Top,
                )],
                GateTable::new(),
            )
            .unwrap(),
        )
        .unwrap();

    let first = page.tour.start(StartRequest::default());
    advance(5_000).await;
    let second = page.tour.start(StartRequest::default());
    assert_ne!(first, second);

    // The first sweep's deadline passes without effect.
    advance(11_000).await;
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.run_id, Some(second));
    assert_eq!(snapshot.phase, Phase::LoadingCheck);

    advance(4_100).await;
    assert_eq!(page.tour.snapshot().phase, Phase::Running);
    let running_frames = page.sink.frames().iter().filter(|f| f.run).count();
    assert_eq!(running_frames, 1);
    assert_eq!(page.sink.last().unwrap().run_id, Some(second));
}

#[tokio::test(start_paused = true)]
async fn recovery_never_moves_the_cursor() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 2).await;

    page.tour
        .handle_event(LifecycleEvent::TargetNotFound { index: 2 });
    page.tour
        .handle_event(LifecycleEvent::TargetNotFound { index: 2 });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.cursor, 2);
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.patched, vec![2]);
    let frame = page.sink.last().unwrap();
    assert_eq!(frame.step_index, 2);
    assert!(frame.steps[2].is_whole_screen());

    // Stale index: ignored.
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 0,
        action: StepAction::Next,
    });
    assert_eq!(page.tour.snapshot().cursor, 2);

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 2,
        action: StepAction::Prev,
    });
    assert_eq!(page.tour.snapshot().cursor, 1);
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 1,
        action: StepAction::Prev,
    });
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 0,
        action: StepAction::Prev,
    });
    assert_eq!(page.tour.snapshot().cursor, 0);
}

#[tokio::test(start_paused = true)]
async fn advancing_onto_a_vanished_target_pre_applies_fallback() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 1).await;

    page.tree.remove("node-1-#main-content [data-tour='upcoming-events']");
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 1,
        action: StepAction::Next,
    });
    let frame = page.sink.last().unwrap();
    assert_eq!(frame.step_index, 2);
    assert!(frame.steps[2].is_whole_screen());
}

#[tokio::test(start_paused = true)]
async fn pre_step_recheck_patches_absent_target() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 1).await;

    page.tree.remove("node-0-#dashboard-stats");
    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 1 });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.patched, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn skip_reports_never_show_and_skipped_once() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 1).await;

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 1,
        action: StepAction::Skip,
    });
    page.tour.handle_event(LifecycleEvent::Status {
        status: TerminalStatus::Skipped,
    });
    settle().await;

    assert_eq!(page.tour.snapshot().phase, Phase::Skipped);
    assert_eq!(session.prefs.count(PreferenceCall::NeverShow), 1);
    assert_eq!(session.prefs.count(PreferenceCall::Skipped), 1);
    assert_eq!(session.prefs.count(PreferenceCall::Completed), 0);
}

#[tokio::test(start_paused = true)]
async fn mid_chain_finish_writes_one_intent_and_no_preference() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    let steps = page.tour.snapshot().steps;
    run_to(&page, steps - 1).await;

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: steps - 1,
        action: StepAction::Next,
    });
    page.tour.handle_event(LifecycleEvent::Status {
        status: TerminalStatus::Finished,
    });
    settle().await;

    assert!(session.prefs.calls().is_empty());
    assert_eq!(session.store.len(), 1);
    assert_eq!(session.navigator.visits(), vec![PageKey::Calendar]);
}

#[tokio::test(start_paused = true)]
async fn last_leg_records_completion_without_intent() {
    let session = Session::new();
    let page = session.mount(PageKey::EventData, Role::Attendee);
    page.render(&["#event-details"]);
    page.tree
        .insert(NodeSpec::new("participants", "#event-participants-panel").gated());
    page.tree
        .add_control(ControlSpec::new("#event-tab-participants").reveals("participants"));
    run_to(&page, 2).await;

    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 2 });
    assert_eq!(page.tree.activation_count("#event-tab-participants"), 1);
    assert_eq!(page.tour.snapshot().phase, Phase::Running);
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 2,
        action: StepAction::Next,
    });
    settle().await;

    assert_eq!(page.tour.snapshot().phase, Phase::Finished);
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::Completed]);
    assert!(session.store.is_empty());
    assert!(session.navigator.visits().is_empty());
}

fn attendance_page(session: &Session) -> Page {
    let page = session.mount(PageKey::MyAttendance, Role::Attendee);
    page.render(&["#attendance-summary", "#attendance-history"]);
    page
}

fn finish_walk(page: &Page) {
    let steps = page.tour.snapshot().steps;
    for index in 0..steps {
        page.tour.handle_event(LifecycleEvent::BeforeStep { index });
        page.tour.handle_event(LifecycleEvent::AfterStep {
            index,
            action: StepAction::Next,
        });
    }
}

#[tokio::test(start_paused = true)]
async fn standalone_start_on_inner_page_records_completion() {
    let session = Session::new();
    let page = attendance_page(&session);
    run_to(&page, 0).await;
    assert!(!page.tour.snapshot().chained);

    finish_walk(&page);
    settle().await;

    assert_eq!(page.tour.snapshot().phase, Phase::Finished);
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::Completed]);
    assert!(session.store.is_empty());
    assert!(session.navigator.visits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn chained_start_on_inner_page_hands_off() {
    let session = Session::new();
    let page = attendance_page(&session);
    page.tour.start(StartRequest {
        skip_welcome: false,
        chain: true,
    });
    settle().await;
    assert!(page.tour.snapshot().chained);

    finish_walk(&page);
    settle().await;

    assert!(session.prefs.calls().is_empty());
    assert_eq!(session.store.len(), 1);
    assert_eq!(session.navigator.visits(), vec![PageKey::MyCertificates]);
}

#[tokio::test(start_paused = true)]
async fn tab_gated_step_is_planned_without_clicking_the_tab() {
    let session = Session::new();
    let page = session.mount(PageKey::EventData, Role::Attendee);
    page.render(&["#event-details"]);
    page.tree
        .insert(NodeSpec::new("participants", "#event-participants-panel").gated());
    page.tree
        .add_control(ControlSpec::new("#event-tab-participants").reveals("participants"));

    // The hidden panel does not hold the sweep for its budget.
    page.tour.start(StartRequest::default());
    settle().await;
    assert_eq!(page.tour.snapshot().phase, Phase::Running);

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 0,
        action: StepAction::Next,
    });
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 1,
        action: StepAction::Next,
    });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.cursor, 2);
    assert!(snapshot.patched.is_empty());
    assert_eq!(page.tree.activation_count("#event-tab-participants"), 0);
}

#[tokio::test(start_paused = true)]
async fn continuation_is_single_use() {
    let session = Session::new();
    let dashboard = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&dashboard);
    let steps = dashboard.tour.snapshot().steps;
    run_to(&dashboard, steps - 1).await;
    dashboard.tour.handle_event(LifecycleEvent::AfterStep {
        index: steps - 1,
        action: StepAction::Next,
    });

    session.clock.advance(1_000);
    let first = session.mount(PageKey::Calendar, Role::Attendee);
    assert!(matches!(
        first.tour.on_mount().await,
        MountDecision::Resume { .. }
    ));

    let again = session.mount(PageKey::Calendar, Role::Attendee);
    assert_eq!(again.tour.on_mount().await, MountDecision::Stay);
    assert_eq!(again.tour.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn stale_intent_is_discarded() {
    let session = Session::new();
    session
        .store
        .set(
            "tour.continuation",
            json!({ "timestampMillis": common::T0, "nextTourKey": "calendar" }).to_string(),
        )
        .unwrap();
    session.clock.advance(11_000);

    let calendar = session.mount(PageKey::Calendar, Role::Attendee);
    assert_eq!(calendar.tour.on_mount().await, MountDecision::Stay);
    assert_eq!(calendar.tour.snapshot().phase, Phase::Idle);
    assert!(session.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn shared_toggle_is_activated_once() {
    let session = Session::new();
    let page = formats_page(&session, 2, true);
    run_to(&page, 3).await;

    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 3 });
    let paused = page.tour.snapshot();
    assert_eq!(paused.phase, Phase::Paused);
    assert!(paused.wait_pending);
    assert!(!page.sink.last().unwrap().run);

    advance(1_000).await;
    let resumed = page.tour.snapshot();
    assert_eq!(resumed.phase, Phase::Running);
    assert_eq!(resumed.cursor, 3);
    assert!(resumed.patched.is_empty());
    let frame = page.sink.last().unwrap();
    assert!(frame.run);
    assert!(!frame.steps[3].is_whole_screen());

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 3,
        action: StepAction::Next,
    });
    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 4 });
    assert_eq!(page.tour.snapshot().phase, Phase::Running);
    assert_eq!(page.tree.activation_count(BOOKING_TOGGLE), 1);
}

#[tokio::test(start_paused = true)]
async fn gate_timeout_falls_back_after_toggle_budget() {
    let session = Session::new();
    let page = formats_page(&session, 0, false);
    run_to(&page, 3).await;

    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 3 });
    advance(4_000).await;
    assert_eq!(page.tour.snapshot().phase, Phase::Paused);

    advance(600).await;
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.cursor, 3);
    assert_eq!(snapshot.patched, vec![3]);
    assert_eq!(page.tree.activation_count(BOOKING_TOGGLE), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_activation_degrades_to_fallback() {
    let session = Session::new();
    let page = session.mount(PageKey::Formats, Role::Admin);
    page.render(&["#main-content [data-tour='formats']", "#format-booking-toggle"]);
    page.tree.add_control(ControlSpec::new(BOOKING_TOGGLE).disabled());
    run_to(&page, 3).await;

    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 3 });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.patched, vec![3]);
    assert!(!snapshot.wait_pending);
}

#[tokio::test(start_paused = true)]
async fn close_during_gate_wait_silences_the_timer() {
    let session = Session::new();
    let page = formats_page(&session, 0, false);
    run_to(&page, 3).await;
    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 3 });
    assert!(page.tour.snapshot().wait_pending);

    page.tour.close();
    let frames = page.sink.count();
    advance(10_000).await;

    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Closed);
    assert!(snapshot.patched.is_empty());
    assert!(!snapshot.wait_pending);
    assert_eq!(page.sink.count(), frames);
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::NeverShow]);
}

#[tokio::test(start_paused = true)]
async fn close_clears_a_pending_intent() {
    let session = Session::new();
    session
        .store
        .set("tour.continuation", "{}".to_string())
        .unwrap();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 0).await;
    page.tour.close();
    assert!(session.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn preference_failures_do_not_block_termination() {
    let session = Session::new();
    session.prefs.fail_everything();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    run_to(&page, 1).await;

    page.tour.close();
    settle().await;
    assert_eq!(page.tour.snapshot().phase, Phase::Closed);
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::NeverShow]);

    // A later run still works.
    run_to(&page, 0).await;
}

#[tokio::test(start_paused = true)]
async fn role_change_rebuilds_only_idle_base_catalogs() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    assert_eq!(page.tour.snapshot().steps, 4);

    tokio_test::assert_ok!(page.tour.set_role(Role::Admin));
    assert_eq!(page.tour.snapshot().steps, 5);

    page.render(&["#dashboard-quick-actions"]);
    run_to(&page, 1).await;
    tokio_test::assert_ok!(page.tour.set_role(Role::Attendee));
    assert_eq!(page.tour.snapshot().steps, 5);

    page.tour.close();
    page.tour.start(StartRequest::default());
    settle().await;
    assert_eq!(page.tour.snapshot().steps, 4);
}

#[tokio::test(start_paused = true)]
async fn custom_catalog_survives_role_change_and_terminal_outcomes() {
    let session = Session::new();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    page.tour
        .set_custom_catalog(
            StepCatalog::custom(
                PageKey::Dashboard,
                vec![StepDescriptor::whole_screen(json!({ "title": "Only" }))],
                GateTable::new(),
            )
            .unwrap(),
        )
        .unwrap();
    page.tour.set_role(Role::Admin).unwrap();
    let snapshot = page.tour.snapshot();
    assert!(snapshot.using_custom_catalog);
    assert_eq!(snapshot.steps, 1);

    run_to(&page, 0).await;
    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 0,
        action: StepAction::Next,
    });
    settle().await;

    // Custom tours never chain.
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::Completed]);
    assert!(session.navigator.visits().is_empty());
    assert_eq!(page.tour.snapshot().steps, 1);

    page.tour.clear_custom_catalog().unwrap();
    assert_eq!(page.tour.snapshot().steps, 5);
}

#[tokio::test(start_paused = true)]
async fn first_visit_on_entry_page_auto_starts() {
    let session = Session::new();
    let dashboard = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&dashboard);
    assert_eq!(dashboard.tour.on_mount().await, MountDecision::AutoStart);
    settle().await;
    let snapshot = dashboard.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.cursor, 0);

    let calendar = session.mount(PageKey::Calendar, Role::Attendee);
    assert_eq!(calendar.tour.on_mount().await, MountDecision::Stay);
}

#[tokio::test(start_paused = true)]
async fn returning_users_are_not_auto_started() {
    let session = Session::new();
    session.prefs.set_status(OnboardingStatus {
        completed: false,
        never_show: true,
    });
    let dashboard = session.mount(PageKey::Dashboard, Role::Attendee);
    assert_eq!(dashboard.tour.on_mount().await, MountDecision::Stay);

    session.prefs.fail_everything();
    let offline = session.mount(PageKey::Dashboard, Role::Attendee);
    assert_eq!(offline.tour.on_mount().await, MountDecision::Stay);
    assert_eq!(offline.tour.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_bus_reports_start_and_outcome() {
    let session = Session::new();
    let mut events = session.bus.subscribe();
    let page = session.mount(PageKey::Dashboard, Role::Attendee);
    render_dashboard(&page);
    let run_id = page.tour.start(StartRequest::default());
    settle().await;
    page.tour.close();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(TourEvent::Started { run_id: id, .. }) if *id == run_id));
    assert!(seen.iter().any(|e| matches!(
        e,
        TourEvent::PhaseChanged { to: Phase::Running, .. }
    )));
    assert!(matches!(
        seen.last(),
        Some(TourEvent::Ended {
            outcome: Outcome::Closed,
            at_step: 0,
            ..
        })
    ));
}
