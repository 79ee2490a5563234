//! In-memory render tree.
//!
//! Backs the harness replays and tests. Selectors are matched verbatim
//! against the selector strings each node declares; there is no CSS engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ReadinessError;
use crate::model::{ComputedStyle, ElementSnapshot, Extent, NodeId};
use crate::ports::{ControlPort, RenderTree};

fn default_extent() -> Extent {
    Extent::new(240.0, 48.0)
}

fn default_display() -> String {
    "block".to_string()
}

fn default_true() -> bool {
    true
}

/// Declarative description of one element
#[derive(Clone, Debug, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub selectors: Vec<String>,
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default = "default_extent")]
    pub extent: Extent,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub in_navigation: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub detached: bool,
    /// Not rendered until a control reveals it
    #[serde(default)]
    pub gated: bool,
}

impl NodeSpec {
    pub fn new(id: &str, selector: &str) -> Self {
        Self {
            id: id.to_string(),
            selectors: vec![selector.to_string()],
            display: default_display(),
            visibility: String::new(),
            extent: default_extent(),
            parent: None,
            in_navigation: false,
            hidden: false,
            detached: false,
            gated: false,
        }
    }

    pub fn also_matches(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn display(mut self, display: &str) -> Self {
        self.display = display.to_string();
        self
    }

    pub fn extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn child_of(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn in_navigation(mut self) -> Self {
        self.in_navigation = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }
}

/// Declarative description of a toggle or tab
#[derive(Clone, Debug, Deserialize)]
pub struct ControlSpec {
    pub selector: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Node ids rendered once the control is active
    #[serde(default)]
    pub reveals: Vec<String>,
    /// Reflows to wait after activation before the nodes appear
    #[serde(default)]
    pub reveal_after_reflows: u32,
}

impl ControlSpec {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            active: false,
            enabled: true,
            reveals: Vec::new(),
            reveal_after_reflows: 0,
        }
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn reveals(mut self, node: &str) -> Self {
        self.reveals.push(node.to_string());
        self
    }

    pub fn reveal_after_reflows(mut self, reflows: u32) -> Self {
        self.reveal_after_reflows = reflows;
        self
    }
}

struct NodeState {
    spec: NodeSpec,
    mounted: bool,
}

struct ControlState {
    spec: ControlSpec,
    activations: usize,
}

struct PendingReveal {
    nodes: Vec<String>,
    remaining: u32,
}

pub struct MemoryRenderTree {
    nodes: DashMap<String, NodeState>,
    order: Mutex<Vec<String>>,
    controls: DashMap<String, ControlState>,
    pending: Mutex<Vec<PendingReveal>>,
    reflows: AtomicUsize,
}

impl MemoryRenderTree {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: DashMap::new(),
            order: Mutex::new(Vec::new()),
            controls: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            reflows: AtomicUsize::new(0),
        })
    }

    pub fn insert(&self, spec: NodeSpec) {
        let id = spec.id.clone();
        let mounted = !spec.gated;
        if self
            .nodes
            .insert(id.clone(), NodeState { spec, mounted })
            .is_none()
        {
            self.order.lock().push(id);
        }
    }

    pub fn remove(&self, id: &str) {
        self.nodes.remove(id);
        self.order.lock().retain(|existing| existing != id);
    }

    pub fn set_extent(&self, id: &str, extent: Extent) {
        if let Some(mut node) = self.nodes.get_mut(id) {
            node.spec.extent = extent;
        }
    }

    pub fn set_display(&self, id: &str, display: &str) {
        if let Some(mut node) = self.nodes.get_mut(id) {
            node.spec.display = display.to_string();
        }
    }

    pub fn mount(&self, id: &str) {
        if let Some(mut node) = self.nodes.get_mut(id) {
            node.mounted = true;
        }
    }

    pub fn add_control(&self, spec: ControlSpec) {
        let reveal_now = spec.active;
        let reveals = spec.reveals.clone();
        self.controls.insert(
            spec.selector.clone(),
            ControlState {
                spec,
                activations: 0,
            },
        );
        if reveal_now {
            for id in reveals {
                self.mount(&id);
            }
        }
    }

    /// Times a control was clicked through [`ControlPort::activate`]
    pub fn activation_count(&self, control: &str) -> usize {
        self.controls
            .get(control)
            .map(|state| state.activations)
            .unwrap_or(0)
    }

    pub fn reflow_count(&self) -> usize {
        self.reflows.load(Ordering::SeqCst)
    }

    fn snapshot(&self, node: &NodeState) -> ElementSnapshot {
        let spec = &node.spec;
        ElementSnapshot {
            id: NodeId::new(spec.id.clone()),
            attached: !spec.detached,
            hidden_attribute: spec.hidden,
            style: ComputedStyle {
                display: spec.display.clone(),
                visibility: spec.visibility.clone(),
            },
            bounding: spec.extent,
            scroll: spec.extent,
            client: spec.extent,
            offset: spec.extent,
            in_navigation: spec.in_navigation,
        }
    }

    fn ordered_ids(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

impl RenderTree for MemoryRenderTree {
    fn reflow(&self) {
        self.reflows.fetch_add(1, Ordering::SeqCst);
        let ready: Vec<String> = {
            let mut pending = self.pending.lock();
            let mut ready = Vec::new();
            pending.retain_mut(|reveal| {
                if reveal.remaining == 0 {
                    ready.append(&mut reveal.nodes);
                    false
                } else {
                    reveal.remaining -= 1;
                    true
                }
            });
            ready
        };
        for id in ready {
            debug!(node = %id, "revealed after reflow");
            self.mount(&id);
        }
    }

    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        self.ordered_ids()
            .iter()
            .filter_map(|id| {
                let node = self.nodes.get(id)?;
                (node.mounted && node.spec.selectors.iter().any(|s| s == selector))
                    .then(|| self.snapshot(&node))
            })
            .collect()
    }

    fn children(&self, parent: &NodeId) -> Vec<ElementSnapshot> {
        self.ordered_ids()
            .iter()
            .filter_map(|id| {
                let node = self.nodes.get(id)?;
                (node.mounted && node.spec.parent.as_deref() == Some(parent.0.as_str()))
                    .then(|| self.snapshot(&node))
            })
            .collect()
    }
}

impl ControlPort for MemoryRenderTree {
    fn is_active(&self, control: &str) -> bool {
        self.controls
            .get(control)
            .map(|state| state.spec.active)
            .unwrap_or(false)
    }

    fn activate(&self, control: &str) -> Result<(), ReadinessError> {
        let (reveals, remaining) = {
            let mut state = self
                .controls
                .get_mut(control)
                .ok_or_else(|| ReadinessError::ControlNotFound(control.to_string()))?;
            if !state.spec.enabled {
                return Err(ReadinessError::ControlDisabled(control.to_string()));
            }
            state.activations += 1;
            state.spec.active = true;
            (state.spec.reveals.clone(), state.spec.reveal_after_reflows)
        };

        if remaining == 0 {
            for id in reveals {
                self.mount(&id);
            }
        } else {
            self.pending.lock().push(PendingReveal {
                nodes: reveals,
                remaining,
            });
        }
        Ok(())
    }
}
