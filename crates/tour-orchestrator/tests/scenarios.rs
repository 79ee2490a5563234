mod common;

use common::{advance, settle, Session};
use serde_json::json;
use step_catalog::{GateTable, Placement, StepCatalog, StepDescriptor, TargetSelector};
use tour_core_types::{PageKey, Role};
use tour_orchestrator::{
    LifecycleEvent, MountDecision, Phase, PreferenceCall, StartRequest, StepAction,
    TerminalStatus,
};
use tour_readiness::{ControlSpec, NodeSpec};
use tour_session_store::SessionStore;

fn element(selector: &str, title: &str) -> StepDescriptor {
    StepDescriptor::element(
        TargetSelector::css(selector),
        json!({ "title": title }),
        Placement::Bottom,
    )
}

fn step_through(tour: &tour_orchestrator::TourOrchestrator, index: usize) {
    tour.handle_event(LifecycleEvent::BeforeStep { index });
    tour.handle_event(LifecycleEvent::AfterStep {
        index,
        action: StepAction::Next,
    });
}

#[tokio::test(start_paused = true)]
async fn missing_target_is_patched_after_preflight_budget() {
    let session = Session::new();
    let page = session.mount(PageKey::EventData, Role::Attendee);
    page.render(&["#sidebar-link"]);
    page.tour
        .set_custom_catalog(
            StepCatalog::custom(
                PageKey::EventData,
                vec![
                    StepDescriptor::whole_screen(json!({ "title": "Welcome" })),
                    element("#sidebar-link", "Sidebar"),
                    element("#missing-panel", "Panel"),
                ],
                GateTable::new(),
            )
            .unwrap(),
        )
        .unwrap();

    page.tour.start(StartRequest::default());
    settle().await;
    assert_eq!(page.tour.snapshot().phase, Phase::LoadingCheck);

    advance(14_000).await;
    assert_eq!(page.tour.snapshot().phase, Phase::LoadingCheck);

    advance(1_100).await;
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.cursor, 0);
    assert_eq!(snapshot.patched, vec![2]);

    let frame = page.sink.last().unwrap();
    assert!(frame.run);
    assert!(frame.steps[0].is_whole_screen());
    assert!(!frame.steps[1].is_whole_screen());
    assert!(frame.steps[2].is_whole_screen());
    assert_eq!(frame.steps[2].placement(), Placement::Center);
    assert_eq!(frame.steps[2].content()["title"], "Panel");

    for index in 0..3 {
        step_through(&page.tour, index);
    }
    page.tour.handle_event(LifecycleEvent::Status {
        status: TerminalStatus::Finished,
    });
    settle().await;

    assert_eq!(page.tour.snapshot().phase, Phase::Finished);
    assert_eq!(session.prefs.calls(), vec![PreferenceCall::Completed]);
    assert!(session.navigator.visits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_on_second_step_ends_run_once() {
    let session = Session::new();
    let page = session.mount(PageKey::EventData, Role::Attendee);
    let selectors = ["#a", "#b", "#c", "#d"];
    page.render(&selectors);
    let mut steps = vec![StepDescriptor::whole_screen(json!({}))];
    steps.extend(selectors.iter().map(|s| element(s, s)));
    page.tour
        .set_custom_catalog(StepCatalog::custom(PageKey::EventData, steps, GateTable::new()).unwrap())
        .unwrap();

    page.tour.start(StartRequest::default());
    settle().await;
    step_through(&page.tour, 0);
    assert_eq!(page.tour.snapshot().cursor, 1);

    page.tour.handle_event(LifecycleEvent::AfterStep {
        index: 1,
        action: StepAction::Close,
    });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Closed);
    assert_eq!(snapshot.cursor, 0);
    assert!(!snapshot.wait_pending);

    let frames_after_close = page.sink.count();
    page.tour.close();
    advance(30_000).await;

    assert_eq!(session.prefs.calls(), vec![PreferenceCall::NeverShow]);
    assert_eq!(page.sink.count(), frames_after_close);
    assert!(!page.sink.last().unwrap().run);
}

#[tokio::test(start_paused = true)]
async fn finished_leg_hands_off_and_next_page_resumes_past_welcome() {
    let session = Session::new();
    let dashboard = session.mount(PageKey::Dashboard, Role::Attendee);
    dashboard.render(&[
        "#dashboard-stats",
        "#main-content [data-tour='upcoming-events']",
    ]);
    dashboard
        .tree
        .insert(NodeSpec::new("nav-cal", "#sidebar [data-tour='nav-calendar']").in_navigation());

    dashboard.tour.start(StartRequest::default());
    settle().await;
    let steps = dashboard.tour.snapshot().steps;
    assert!(dashboard.tour.snapshot().patched.is_empty());
    for index in 0..steps {
        step_through(&dashboard.tour, index);
    }
    settle().await;

    assert_eq!(dashboard.tour.snapshot().phase, Phase::Finished);
    assert_eq!(session.navigator.visits(), vec![PageKey::Calendar]);
    assert!(session.prefs.calls().is_empty());
    let raw = session.store.get("tour.continuation").unwrap().unwrap();
    let intent: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(intent["nextTourKey"], "calendar");
    assert_eq!(intent["timestampMillis"], common::T0);

    session.clock.advance(2_000);
    let calendar = session.mount(PageKey::Calendar, Role::Attendee);
    calendar.render(&["#calendar-view", "#calendar-filters"]);
    let decision = calendar.tour.on_mount().await;
    assert!(matches!(decision, MountDecision::Resume { .. }));
    settle().await;

    let snapshot = calendar.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.cursor, 1);
    assert!(snapshot.chained);
    assert!(session.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggle_already_on_is_not_clicked() {
    let session = Session::new();
    let page = session.mount(PageKey::Formats, Role::Admin);
    page.render(&[
        "#main-content [data-tour='formats']",
        "#format-booking-toggle",
        "#format-booking-settings",
        "#format-booking-capacity",
    ]);
    let toggle = "#format-booking-toggle input[type='checkbox']";
    page.tree.add_control(ControlSpec::new(toggle).active());

    page.tour.start(StartRequest::default());
    settle().await;
    for index in 0..3 {
        step_through(&page.tour, index);
    }
    assert_eq!(page.tour.snapshot().cursor, 3);

    page.tour.handle_event(LifecycleEvent::BeforeStep { index: 3 });
    let snapshot = page.tour.snapshot();
    assert_eq!(snapshot.phase, Phase::Running);
    assert_eq!(snapshot.cursor, 3);
    assert!(snapshot.patched.is_empty());
    assert!(!snapshot.wait_pending);
    assert_eq!(page.tree.activation_count(toggle), 0);
}
