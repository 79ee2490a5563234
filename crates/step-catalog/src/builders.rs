//! Per-page, per-role catalog builders

use serde_json::{json, Value};
use tour_core_types::{PageKey, Role};
use tracing::debug;

use crate::catalog::StepCatalog;
use crate::errors::CatalogError;
use crate::gates::{GateTable, Prerequisite};
use crate::targets::TargetTable;
use crate::types::{Placement, StepDescriptor};

fn tip(title: &str, body: &str) -> Value {
    json!({ "title": title, "body": body })
}

/// Selectors used across the application's pages.
///
/// Entries listing two selectors carry a scoped content selector first and
/// the bare attribute selector second; the bare one also matches the sidebar
/// shortcut, which the readiness detector will skip unless pinned.
pub fn app_targets() -> TargetTable {
    TargetTable::new()
        .define("dashboard-stats", ["#dashboard-stats"])
        .define(
            "upcoming-events",
            [
                "#main-content [data-tour='upcoming-events']",
                "[data-tour='upcoming-events']",
            ],
        )
        .define("quick-actions", ["#dashboard-quick-actions"])
        .define_navigation("nav-calendar", ["#sidebar [data-tour='nav-calendar']"])
        .define("calendar-view", ["#calendar-view"])
        .define("calendar-filters", ["#calendar-filters"])
        .define("calendar-create", ["#calendar-create-event"])
        .define("events-table", ["#events-table"])
        .define("events-search", ["#events-search"])
        .define("events-new", ["#events-new-button"])
        .define(
            "formats-list",
            ["#main-content [data-tour='formats']", "[data-tour='formats']"],
        )
        .define("format-booking-toggle", ["#format-booking-toggle"])
        .define("booking-settings", ["#format-booking-settings"])
        .define("booking-capacity", ["#format-booking-capacity"])
        .define("bookings-upcoming", ["#bookings-upcoming"])
        .define("bookings-past", ["#bookings-past"])
        .define("attendance-summary", ["#attendance-summary"])
        .define("attendance-history", ["#attendance-history"])
        .define("certificates-list", ["#certificates-list"])
        .define("certificates-download", ["#certificates-download"])
        .define("event-details", ["#event-details"])
        .define("event-participants", ["#event-participants-panel"])
        .define("event-booking-settings", ["#event-booking-settings"])
}

fn element(
    targets: &TargetTable,
    logical: &str,
    content: Value,
    placement: Placement,
) -> Result<StepDescriptor, CatalogError> {
    Ok(StepDescriptor::element(
        targets.resolve(logical)?,
        content,
        placement,
    ))
}

/// Role-derived catalog for the landing page
pub fn build_for_role(role: Role) -> Result<StepCatalog, CatalogError> {
    build_catalog(PageKey::Dashboard, role)
}

/// Catalog for one page and role
pub fn build_catalog(page: PageKey, role: Role) -> Result<StepCatalog, CatalogError> {
    let targets = app_targets();
    let catalog = match page {
        PageKey::Dashboard => dashboard(&targets, role),
        PageKey::Calendar => calendar(&targets, role),
        PageKey::EventsList => events_list(&targets, role),
        PageKey::Formats => formats(&targets, role),
        PageKey::MyBookings => my_bookings(&targets, role),
        PageKey::MyAttendance => my_attendance(&targets, role),
        PageKey::MyCertificates => my_certificates(&targets, role),
        PageKey::EventData => event_data(&targets, role),
    }?;
    debug!(
        %page,
        %role,
        steps = catalog.len(),
        gated = !catalog.gates().is_empty(),
        "catalog built"
    );
    Ok(catalog)
}

fn dashboard(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    let manages = role.manages_events();
    StepCatalog::builder(PageKey::Dashboard)
        .role(role)
        .welcome(tip(
            "Welcome aboard",
            "A short tour of the pages you will use most.",
        ))
        .step(
            element(
                targets,
                "dashboard-stats",
                tip("Your numbers", "Bookings, attendance and certificates at a glance."),
                Placement::Bottom,
            )?
            .with_spotlight_padding(8),
        )
        .step(element(
            targets,
            "upcoming-events",
            tip("Coming up", "The next events you are involved in."),
            Placement::Top,
        )?)
        .step_if(
            manages,
            element(
                targets,
                "quick-actions",
                tip("Quick actions", "Create events and formats from here."),
                Placement::Left,
            )?,
        )
        .step(element(
            targets,
            "nav-calendar",
            tip("Calendar", "Next we will look at the calendar."),
            Placement::Right,
        )?)
        .build()
}

fn calendar(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    StepCatalog::builder(PageKey::Calendar)
        .role(role)
        .welcome(tip("Calendar", "Every scheduled session in one view."))
        .step(element(
            targets,
            "calendar-view",
            tip("Month view", "Click a day to see its sessions."),
            Placement::Top,
        )?)
        .step(element(
            targets,
            "calendar-filters",
            tip("Filters", "Narrow the calendar by format or location."),
            Placement::Bottom,
        )?)
        .step_if(
            role.manages_events(),
            element(
                targets,
                "calendar-create",
                tip("Schedule", "Add a session straight from the calendar."),
                Placement::Left,
            )?,
        )
        .build()
}

fn events_list(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    StepCatalog::builder(PageKey::EventsList)
        .role(role)
        .welcome(tip("Events", "All events you can see, in a searchable list."))
        .step(element(
            targets,
            "events-search",
            tip("Search", "Find events by title, trainer or place."),
            Placement::Bottom,
        )?)
        .step(element(
            targets,
            "events-table",
            tip("Event list", "Open an event to see its details."),
            Placement::Top,
        )?)
        .step_if(
            role.manages_events(),
            element(
                targets,
                "events-new",
                tip("New event", "Start a new event from a format."),
                Placement::Left,
            )?,
        )
        .build()
}

fn formats(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    let manages = role.manages_events();
    let mut builder = StepCatalog::builder(PageKey::Formats)
        .role(role)
        .welcome(tip("Formats", "Formats are the templates events are built from."))
        .step(element(
            targets,
            "formats-list",
            tip("Format catalogue", "Each card is a reusable training format."),
            Placement::Top,
        )?);

    if manages {
        builder = builder
            .step(element(
                targets,
                "format-booking-toggle",
                tip("Online booking", "Enable booking to let attendees reserve a seat."),
                Placement::Right,
            )?)
            .step(element(
                targets,
                "booking-settings",
                tip("Booking settings", "Opening dates and confirmation rules."),
                Placement::Right,
            )?)
            .step(element(
                targets,
                "booking-capacity",
                tip("Capacity", "Seats available per session."),
                Placement::Right,
            )?)
            .gates(
                GateTable::new()
                    .with_prerequisite(Prerequisite::toggle(
                        "format-booking-enabled",
                        "#format-booking-toggle input[type='checkbox']",
                    ))
                    .with_rule("booking-*", "format-booking-enabled"),
            );
    }

    builder.build()
}

fn my_bookings(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    StepCatalog::builder(PageKey::MyBookings)
        .role(role)
        .welcome(tip("My bookings", "Seats you have reserved."))
        .step(element(
            targets,
            "bookings-upcoming",
            tip("Upcoming", "Cancel or change a booking before it starts."),
            Placement::Top,
        )?)
        .step(element(
            targets,
            "bookings-past",
            tip("History", "Past bookings live in their own tab."),
            Placement::Top,
        )?)
        .gates(
            GateTable::new()
                .with_prerequisite(Prerequisite::tab("bookings-past-tab", "#bookings-tab-past"))
                .with_rule("bookings-past", "bookings-past-tab"),
        )
        .build()
}

fn my_attendance(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    StepCatalog::builder(PageKey::MyAttendance)
        .role(role)
        .welcome(tip("My attendance", "Hours attended across all events."))
        .step(element(
            targets,
            "attendance-summary",
            tip("Summary", "Total hours and attendance rate."),
            Placement::Bottom,
        )?)
        .step(element(
            targets,
            "attendance-history",
            tip("Sessions", "Every session you signed in to."),
            Placement::Top,
        )?)
        .build()
}

fn my_certificates(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    StepCatalog::builder(PageKey::MyCertificates)
        .role(role)
        .welcome(tip("My certificates", "Certificates issued for completed events."))
        .step(element(
            targets,
            "certificates-list",
            tip("Certificates", "One row per completed event."),
            Placement::Top,
        )?)
        .step(element(
            targets,
            "certificates-download",
            tip("Download", "Get a PDF copy whenever you need it."),
            Placement::Left,
        )?)
        .build()
}

fn event_data(targets: &TargetTable, role: Role) -> Result<StepCatalog, CatalogError> {
    let manages = role.manages_events();
    let mut gates = GateTable::new()
        .with_prerequisite(Prerequisite::tab(
            "participants-tab",
            "#event-tab-participants",
        ))
        .with_rule("event-participants", "participants-tab");
    if manages {
        gates = gates
            .with_prerequisite(Prerequisite::toggle(
                "event-booking-enabled",
                "#event-booking-toggle input[type='checkbox']",
            ))
            .with_rule("event-booking-*", "event-booking-enabled");
    }

    StepCatalog::builder(PageKey::EventData)
        .role(role)
        .welcome(tip("Event details", "Everything about a single event."))
        .step(element(
            targets,
            "event-details",
            tip("Details", "Dates, location and trainers."),
            Placement::Bottom,
        )?)
        .step(element(
            targets,
            "event-participants",
            tip("Participants", "Who is coming and who attended."),
            Placement::Top,
        )?)
        .step_if(
            manages,
            element(
                targets,
                "event-booking-settings",
                tip("Booking", "Booking rules specific to this event."),
                Placement::Right,
            )?,
        )
        .gates(gates)
        .build()
}
