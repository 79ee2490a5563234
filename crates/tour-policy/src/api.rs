use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::errors::PolicyError;
use crate::model::{PolicySource, RuntimeOverrideSpec, TourPolicy};

#[async_trait]
pub trait PolicyCenter: Send + Sync {
    async fn snapshot(&self) -> Arc<TourPolicy>;
    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError>;
    fn subscribe(&self) -> watch::Receiver<Arc<TourPolicy>>;
}

#[derive(Clone, Debug)]
struct OverrideEntry {
    value: Value,
    owner: String,
    expires_at: Option<Instant>,
}

struct PolicyState {
    base: TourPolicy,
    current: TourPolicy,
    overrides: HashMap<String, OverrideEntry>,
    rev_counter: u64,
}

impl PolicyState {
    fn new(base: TourPolicy) -> Self {
        let rev_counter = base.rev;
        Self {
            current: base.clone(),
            base,
            overrides: HashMap::new(),
            rev_counter,
        }
    }

    fn recompute(&mut self) -> Result<(), PolicyError> {
        let now = Instant::now();
        self.overrides
            .retain(|_, entry| entry.expires_at.map(|at| at > now).unwrap_or(true));

        let mut next = self.base.clone();
        for (path, entry) in &self.overrides {
            apply_override_to_policy(&mut next, path, &entry.value, PolicySource::RuntimeOverride)?;
        }
        self.rev_counter = self.rev_counter.saturating_add(1);
        next.rev = self.rev_counter;
        self.current = next;
        Ok(())
    }
}

/// Policy holder with runtime overrides and change notification.
pub struct InMemoryPolicyCenter {
    state: Arc<Mutex<PolicyState>>,
    watch_tx: watch::Sender<Arc<TourPolicy>>,
}

impl InMemoryPolicyCenter {
    pub fn new(policy: TourPolicy) -> Self {
        let state = PolicyState::new(policy);
        let (watch_tx, _watch_rx) = watch::channel(Arc::new(state.current.clone()));
        Self {
            state: Arc::new(Mutex::new(state)),
            watch_tx,
        }
    }
}

#[async_trait]
impl PolicyCenter for InMemoryPolicyCenter {
    async fn snapshot(&self) -> Arc<TourPolicy> {
        let guard = self.state.lock().await;
        Arc::new(guard.current.clone())
    }

    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError> {
        let ttl = (override_spec.ttl_seconds > 0)
            .then(|| Duration::from_secs(override_spec.ttl_seconds));

        let mut guard = self.state.lock().await;
        // Reject bad paths before they enter the ledger.
        let mut candidate = guard.current.clone();
        apply_override_to_policy(
            &mut candidate,
            &override_spec.path,
            &override_spec.value,
            PolicySource::RuntimeOverride,
        )?;
        guard.overrides.insert(
            override_spec.path.clone(),
            OverrideEntry {
                value: override_spec.value.clone(),
                owner: override_spec.owner.clone(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        guard.recompute()?;
        let snapshot = Arc::new(guard.current.clone());
        drop(guard);

        info!(
            path = %override_spec.path,
            owner = %override_spec.owner,
            reason = %override_spec.reason,
            "policy override applied"
        );
        let _ = self.watch_tx.send(snapshot);

        if let Some(ttl) = ttl {
            let state = Arc::clone(&self.state);
            let watch_tx = self.watch_tx.clone();
            let path = override_spec.path;
            tokio::spawn(async move {
                sleep(ttl).await;
                let mut guard = state.lock().await;
                let Some(entry) = guard.overrides.get(&path).cloned() else {
                    return;
                };
                if entry.expires_at.map(|at| at > Instant::now()).unwrap_or(true) {
                    // Replaced by a later override with a longer lifetime.
                    return;
                }
                match guard.recompute() {
                    Ok(()) => {
                        let snapshot = Arc::new(guard.current.clone());
                        drop(guard);
                        info!(path = %path, owner = %entry.owner, "policy override expired");
                        if watch_tx.send(snapshot).is_err() {
                            warn!("policy override expiry broadcast had no listeners");
                        }
                    }
                    Err(err) => warn!("policy override expiry recompute failed: {err}"),
                }
            });
        }

        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Arc<TourPolicy>> {
        self.watch_tx.subscribe()
    }
}

/// Fixed policy channel for callers without a policy center
pub fn fixed_policy(policy: TourPolicy) -> watch::Receiver<Arc<TourPolicy>> {
    let (_tx, rx) = watch::channel(Arc::new(policy));
    rx
}

pub(crate) fn apply_override_to_policy(
    policy: &mut TourPolicy,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    match path {
        "preflight.budget_ms" => policy.preflight.budget_ms = to_u64(value)?,
        "preflight.poll_interval_ms" => policy.preflight.poll_interval_ms = to_nonzero(value)?,
        "gates.poll_interval_ms" => policy.gates.poll_interval_ms = to_nonzero(value)?,
        "gates.toggle_attempts" => policy.gates.toggle_attempts = to_u32(value)?,
        "gates.tab_attempts" => policy.gates.tab_attempts = to_u32(value)?,
        "continuation.validity_window_ms" => {
            policy.continuation.validity_window_ms = to_u64(value)?
        }
        "continuation.storage_key" => policy.continuation.storage_key = to_string(value)?,
        "features.auto_start" => policy.features.auto_start = to_bool(value)?,
        "features.chain" => policy.features.chain = to_bool(value)?,
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    }
    policy.set_provenance(path, source);
    Ok(())
}

fn to_u64(value: &Value) -> Result<u64, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected unsigned integer, got {value}")))
}

fn to_nonzero(value: &Value) -> Result<u64, PolicyError> {
    match to_u64(value)? {
        0 => Err(PolicyError::InvalidValue("interval must be positive".into())),
        v => Ok(v),
    }
}

fn to_u32(value: &Value) -> Result<u32, PolicyError> {
    let raw = to_u64(value)?;
    u32::try_from(raw).map_err(|_| PolicyError::InvalidValue(format!("value {raw} exceeds u32")))
}

fn to_bool(value: &Value) -> Result<bool, PolicyError> {
    value
        .as_bool()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected bool, got {value}")))
}

fn to_string(value: &Value) -> Result<String, PolicyError> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(PolicyError::InvalidValue(format!(
            "expected non-empty string, got {value}"
        ))),
    }
}
