//! Prerequisite activation and post-activation polling

use std::sync::Arc;

use step_catalog::{Prerequisite, Target};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tour_readiness::{ControlPort, ReadinessDetector};
use tracing::{debug, info, warn};

use crate::errors::GateError;
use crate::types::{Activation, ActivatedSet, GateOutcome, PollBudget};

pub struct DependencyResolver {
    detector: Arc<ReadinessDetector>,
    controls: Arc<dyn ControlPort>,
}

impl DependencyResolver {
    pub fn new(detector: Arc<ReadinessDetector>, controls: Arc<dyn ControlPort>) -> Self {
        Self { detector, controls }
    }

    /// Switch the prerequisite on unless it already is, or was switched on
    /// earlier in this run.
    pub fn ensure_active(
        &self,
        prerequisite: &Prerequisite,
        activated: &mut ActivatedSet,
    ) -> Result<Activation, GateError> {
        if activated.contains(&prerequisite.key) {
            debug!(key = %prerequisite.key, "prerequisite already activated in this run");
            return Ok(Activation::AlreadyActivated);
        }
        if self.controls.is_active(&prerequisite.control) {
            debug!(key = %prerequisite.key, "prerequisite already active");
            return Ok(Activation::AlreadyActive);
        }

        self.controls
            .activate(&prerequisite.control)
            .map_err(|err| {
                warn!(key = %prerequisite.key, control = %prerequisite.control, "activation failed: {err}");
                GateError::Activation {
                    control: prerequisite.control.clone(),
                    reason: err.to_string(),
                }
            })?;
        activated.record(prerequisite.key.clone());
        info!(
            key = %prerequisite.key,
            kind = prerequisite.kind.name(),
            "prerequisite activated"
        );
        Ok(Activation::Clicked)
    }

    /// Poll strict readiness until the target paints or the budget runs out.
    pub async fn wait_ready(
        &self,
        target: &Target,
        budget: PollBudget,
        cancel: &CancellationToken,
    ) -> Result<GateOutcome, GateError> {
        let mut last_reason = None;
        for attempt in 1..=budget.attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                _ = sleep(budget.interval) => {}
            }
            let readiness = self.detector.measure(target);
            if readiness.ready {
                debug!(step_target = target.label(), attempt, "gated target ready");
                return Ok(GateOutcome::Ready { attempts: attempt });
            }
            last_reason = readiness.reason;
        }
        warn!(
            step_target = target.label(),
            attempts = budget.attempts,
            reason = last_reason.as_deref().unwrap_or("unknown"),
            "gated target did not become ready"
        );
        Ok(GateOutcome::TimedOut {
            attempts: budget.attempts,
            last_reason,
        })
    }
}
