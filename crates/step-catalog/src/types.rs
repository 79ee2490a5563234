//! Core types for tour steps

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tooltip placement relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

/// Which screen region wins when one selector matches in several places.
///
/// Some logical targets match both a content element and a navigation
/// shortcut carrying the same attribute. Content wins unless the step is
/// explicitly about the navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionPreference {
    #[default]
    PreferContent,
    PinNavigation,
}

/// Resolved element target: a logical name plus its ordered selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    /// Logical name, also the key used by gate rules
    pub logical: String,

    /// Candidate selectors, preferred first
    pub selectors: Vec<String>,

    /// Region disambiguation rule
    #[serde(default)]
    pub region: RegionPreference,
}

impl TargetSelector {
    /// Single-selector target whose logical name is the selector itself
    pub fn css(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            logical: selector.clone(),
            selectors: vec![selector],
            region: RegionPreference::PreferContent,
        }
    }

    pub fn with_region(mut self, region: RegionPreference) -> Self {
        self.region = region;
        self
    }

    /// Preferred selector, used in log lines
    pub fn primary(&self) -> Option<&str> {
        self.selectors.first().map(String::as_str)
    }
}

/// What a step points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Target {
    /// No specific element; the step is shown centered over the page
    WholeScreen,

    /// A concrete interface element
    Element(TargetSelector),
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Target::Element(TargetSelector::css(selector))
    }

    pub fn is_whole_screen(&self) -> bool {
        matches!(self, Target::WholeScreen)
    }

    pub fn selector(&self) -> Option<&TargetSelector> {
        match self {
            Target::WholeScreen => None,
            Target::Element(selector) => Some(selector),
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &str {
        match self {
            Target::WholeScreen => "whole-screen",
            Target::Element(selector) => &selector.logical,
        }
    }
}

/// One stop of a guided tour.
///
/// Fields are private so the whole-screen/center invariant holds for every
/// descriptor built through this API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    target: Target,

    /// Renderable payload owned by the caller
    #[serde(default)]
    content: Value,

    placement: Placement,

    #[serde(default)]
    disable_beacon: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    spotlight_padding: Option<u32>,

    /// Remaining presentation hints, passed through untouched
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    hints: Map<String, Value>,
}

impl StepDescriptor {
    /// Centered step with no specific target
    pub fn whole_screen(content: Value) -> Self {
        Self {
            target: Target::WholeScreen,
            content,
            placement: Placement::Center,
            disable_beacon: true,
            spotlight_padding: None,
            hints: Map::new(),
        }
    }

    /// Step anchored on an element
    pub fn element(selector: TargetSelector, content: Value, placement: Placement) -> Self {
        Self {
            target: Target::Element(selector),
            content,
            placement,
            disable_beacon: false,
            spotlight_padding: None,
            hints: Map::new(),
        }
    }

    pub fn with_beacon_disabled(mut self) -> Self {
        self.disable_beacon = true;
        self
    }

    pub fn with_spotlight_padding(mut self, padding: u32) -> Self {
        self.spotlight_padding = Some(padding);
        self
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.hints.insert(key.into(), value);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn disable_beacon(&self) -> bool {
        self.disable_beacon
    }

    pub fn spotlight_padding(&self) -> Option<u32> {
        self.spotlight_padding
    }

    pub fn hints(&self) -> &Map<String, Value> {
        &self.hints
    }

    pub fn is_whole_screen(&self) -> bool {
        self.target.is_whole_screen()
    }

    /// Rewrites this descriptor into its centered whole-screen form.
    /// Content and other hints are kept.
    pub fn make_whole_screen(&mut self) {
        self.target = Target::WholeScreen;
        self.placement = Placement::Center;
        self.disable_beacon = true;
    }

    /// Whether the whole-screen/center invariant holds
    pub fn is_consistent(&self) -> bool {
        !self.is_whole_screen() || self.placement == Placement::Center
    }
}
