use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the tour crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TourError {
    #[error("{message}")]
    Message { message: String },

    #[error("unknown page key: {0}")]
    UnknownPage(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl TourError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identity of one live tour run. A fresh id is minted on every start so
/// that timers armed by an earlier run can recognise they are stale.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pages that host a leg of the onboarding tour.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKey {
    Dashboard,
    Calendar,
    EventsList,
    Formats,
    MyBookings,
    MyAttendance,
    MyCertificates,
    EventData,
}

impl PageKey {
    pub const ALL: [PageKey; 8] = [
        PageKey::Dashboard,
        PageKey::Calendar,
        PageKey::EventsList,
        PageKey::Formats,
        PageKey::MyBookings,
        PageKey::MyAttendance,
        PageKey::MyCertificates,
        PageKey::EventData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKey::Dashboard => "dashboard",
            PageKey::Calendar => "calendar",
            PageKey::EventsList => "events-list",
            PageKey::Formats => "formats",
            PageKey::MyBookings => "my-bookings",
            PageKey::MyAttendance => "my-attendance",
            PageKey::MyCertificates => "my-certificates",
            PageKey::EventData => "event-data",
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageKey {
    type Err = TourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageKey::ALL
            .iter()
            .copied()
            .find(|page| page.as_str() == s)
            .ok_or_else(|| TourError::UnknownPage(s.to_string()))
    }
}

/// Roles the application distinguishes when building tour content.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Organizer,
    Attendee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Attendee => "attendee",
        }
    }

    /// Roles allowed to manage events rather than only attend them.
    pub fn manages_events(&self) -> bool {
        matches!(self, Role::Admin | Role::Organizer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "attendee" => Ok(Role::Attendee),
            other => Err(TourError::UnknownRole(other.to_string())),
        }
    }
}

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and scripted replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
