use crate::errors::ReadinessError;
use crate::model::{ElementSnapshot, NodeId};

/// Read-only view over the host's render tree.
pub trait RenderTree: Send + Sync {
    /// Force pending layout so the next measurements are current.
    fn reflow(&self);

    /// Every element matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot>;

    /// Direct children of an element.
    fn children(&self, id: &NodeId) -> Vec<ElementSnapshot>;
}

/// Prerequisite controls (toggles, tabs) the tour may switch on.
pub trait ControlPort: Send + Sync {
    fn is_active(&self, control: &str) -> bool;

    /// Click the control once.
    fn activate(&self, control: &str) -> Result<(), ReadinessError>;
}
