//! Cross-page continuation
//!
//! Finishing one leg of the chained tour writes a single intent record to
//! session storage and navigates. The next page consumes the record on
//! mount: it is read and deleted in one step, then honored only while it is
//! fresh and addressed to the mounting page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tour_core_types::{Clock, PageKey};
use tour_policy::ContinuationPolicy;
use tour_session_store::SessionStore;
use tracing::{debug, info, warn};

use crate::errors::ContinuationError;
use crate::types::Navigator;

/// Page whose tour opens the chain
pub const CHAIN_ENTRY: PageKey = PageKey::Dashboard;

/// Successor of `page` in the chained tour, `None` on the last leg
pub fn chain_next(page: PageKey) -> Option<PageKey> {
    match page {
        PageKey::Dashboard => Some(PageKey::Calendar),
        PageKey::Calendar => Some(PageKey::EventsList),
        PageKey::EventsList => Some(PageKey::Formats),
        PageKey::Formats => Some(PageKey::MyBookings),
        PageKey::MyBookings => Some(PageKey::MyAttendance),
        PageKey::MyAttendance => Some(PageKey::MyCertificates),
        PageKey::MyCertificates => Some(PageKey::EventData),
        PageKey::EventData => None,
    }
}

/// Resume record stored between page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationIntent {
    pub timestamp_millis: i64,
    pub next_tour_key: PageKey,
}

impl ContinuationIntent {
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.timestamp_millis
    }

    /// Written no more than `window_ms` ago. Timestamps from the future
    /// never count as fresh.
    pub fn is_fresh(&self, now_millis: i64, window_ms: u64) -> bool {
        let age = self.age_millis(now_millis);
        age >= 0 && (age as u64) < window_ms
    }
}

/// What a page does when it mounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MountDecision {
    /// A fresh intent was consumed; the run starts past the welcome step
    Resume { intent: ContinuationIntent },
    /// First visit on the chain entry page
    AutoStart,
    Stay,
}

pub struct ContinuationCoordinator {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
}

impl ContinuationCoordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            navigator,
            clock,
        }
    }

    /// Write the intent for `next`, then navigate there.
    pub fn hand_off(
        &self,
        next: PageKey,
        policy: &ContinuationPolicy,
    ) -> Result<ContinuationIntent, ContinuationError> {
        let intent = ContinuationIntent {
            timestamp_millis: self.clock.now_millis(),
            next_tour_key: next,
        };
        let encoded = serde_json::to_string(&intent)
            .map_err(|err| ContinuationError::Malformed(err.to_string()))?;
        self.store.set(&policy.storage_key, encoded)?;
        info!(next = %next, "continuation intent written");
        self.navigator.navigate(next);
        Ok(intent)
    }

    /// Read-and-delete the intent; returns it only when it should be honored.
    pub fn consume(
        &self,
        page: PageKey,
        policy: &ContinuationPolicy,
    ) -> Option<ContinuationIntent> {
        let raw = match self.store.take(&policy.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(page = %page, "continuation record unreadable: {err}");
                return None;
            }
        };
        let intent: ContinuationIntent = match serde_json::from_str(&raw) {
            Ok(intent) => intent,
            Err(err) => {
                warn!(page = %page, "continuation record malformed, discarded: {err}");
                return None;
            }
        };

        let now = self.clock.now_millis();
        if !intent.is_fresh(now, policy.validity_window_ms) {
            debug!(
                page = %page,
                age_ms = intent.age_millis(now),
                window_ms = policy.validity_window_ms,
                "stale continuation intent discarded"
            );
            return None;
        }
        if intent.next_tour_key != page {
            debug!(
                page = %page,
                addressed_to = %intent.next_tour_key,
                "continuation intent for another page discarded"
            );
            return None;
        }
        Some(intent)
    }

    /// Remove any pending intent
    pub fn clear(&self, policy: &ContinuationPolicy) -> Result<(), ContinuationError> {
        self.store.remove(&policy.storage_key)?;
        Ok(())
    }

    /// Intent currently stored, without consuming it
    pub fn peek(
        &self,
        policy: &ContinuationPolicy,
    ) -> Result<Option<ContinuationIntent>, ContinuationError> {
        match self.store.get(&policy.storage_key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| ContinuationError::Malformed(err.to_string())),
            None => Ok(None),
        }
    }
}
