use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const ZERO: Extent = Extent {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Block,
    Inline,
    Flex,
    Grid,
}

impl LayoutKind {
    pub fn from_display(display: &str) -> Self {
        match display.trim().to_ascii_lowercase().as_str() {
            "flex" | "inline-flex" => LayoutKind::Flex,
            "grid" | "inline-grid" => LayoutKind::Grid,
            "inline" => LayoutKind::Inline,
            _ => LayoutKind::Block,
        }
    }

    /// Containers whose own box may collapse while children still paint
    pub fn is_flexible(&self) -> bool {
        matches!(self, LayoutKind::Flex | LayoutKind::Grid)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
}

impl ComputedStyle {
    pub fn hides(&self) -> bool {
        self.display.trim().eq_ignore_ascii_case("none")
            || self.visibility.trim().eq_ignore_ascii_case("hidden")
    }

    pub fn layout(&self) -> LayoutKind {
        LayoutKind::from_display(&self.display)
    }
}

/// Measurements of one element taken after a reflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub id: NodeId,
    pub attached: bool,
    pub hidden_attribute: bool,
    pub style: ComputedStyle,
    pub bounding: Extent,
    pub scroll: Extent,
    pub client: Extent,
    pub offset: Extent,
    /// Lives inside a secondary navigation region (sidebar, shortcuts)
    pub in_navigation: bool,
}

impl ElementSnapshot {
    /// Zero on every one of the four extents the host exposes
    pub fn has_no_extent(&self) -> bool {
        self.bounding.is_zero()
            && self.scroll.is_zero()
            && self.client.is_zero()
            && self.offset.is_zero()
    }

    pub fn layout(&self) -> LayoutKind {
        self.style.layout()
    }
}
