pub mod detector;
pub mod errors;
pub mod judges;
pub mod memory;
pub mod model;
pub mod ports;

pub use detector::{Readiness, ReadinessDetector};
pub use errors::ReadinessError;
pub use judges::JudgeReport;
pub use memory::{ControlSpec, MemoryRenderTree, NodeSpec};
pub use model::{ComputedStyle, ElementSnapshot, Extent, LayoutKind, NodeId};
pub use ports::{ControlPort, RenderTree};
