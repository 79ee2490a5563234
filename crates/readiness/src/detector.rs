//! Readiness detection for step targets

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use step_catalog::{GateTable, RegionPreference, Target, TargetSelector};
use tracing::debug;

use crate::judges;
use crate::model::ElementSnapshot;
use crate::ports::RenderTree;

/// Outcome of a readiness check. Never an error: an unready target always
/// carries a human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub reason: Option<String>,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ready: true,
            reason: None,
        }
    }

    pub fn ready_because(reason: impl Into<String>) -> Self {
        Self {
            ready: true,
            reason: Some(reason.into()),
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: Some(reason.into()),
        }
    }
}

pub struct ReadinessDetector {
    tree: Arc<dyn RenderTree>,
}

impl ReadinessDetector {
    pub fn new(tree: Arc<dyn RenderTree>) -> Self {
        Self { tree }
    }

    /// Readiness as seen while planning a step.
    ///
    /// Targets inside a panel that a tab switch will reveal count as ready:
    /// the dependency resolver activates the panel before the step shows.
    pub fn check(&self, target: &Target, gates: &GateTable) -> Readiness {
        if gates.is_deferred(target) {
            let strict = self.measure(target);
            if !strict.ready {
                debug!(step_target = target.label(), "target deferred behind tab");
                return Readiness::ready_because("deferred");
            }
            return strict;
        }
        self.measure(target)
    }

    /// Strict readiness: the element must be painted right now.
    pub fn measure(&self, target: &Target) -> Readiness {
        let selector = match target {
            Target::WholeScreen => return Readiness::ready(),
            Target::Element(selector) => selector,
        };

        self.tree.reflow();

        let Some(element) = self.resolve(selector) else {
            return Readiness::not_ready(format!(
                "missing({})",
                selector.primary().unwrap_or_default()
            ));
        };

        let report = judges::visible(&element);
        if report.ok {
            return Readiness::ready();
        }
        if report.only_zero_extent() && element.layout().is_flexible() {
            if let Some(reason) = self.painted_children(&element) {
                return Readiness::ready_because(reason);
            }
        }
        debug!(
            step_target = %selector.logical,
            node = %element.id,
            reason = %report.reason,
            facts = %report.facts,
            "target not ready"
        );
        Readiness::not_ready(report.reason)
    }

    /// Picks the element a selector list refers to.
    ///
    /// Selectors are tried in order. Within one selector's matches the
    /// region rule decides first, then visibility.
    pub fn resolve(&self, selector: &TargetSelector) -> Option<ElementSnapshot> {
        for css in &selector.selectors {
            let candidates = self.tree.query_all(css);
            if candidates.is_empty() {
                continue;
            }
            let best = select_candidate(candidates, selector.region);
            if best.is_some() {
                return best;
            }
        }
        None
    }

    fn painted_children(&self, container: &ElementSnapshot) -> Option<String> {
        let children = self.tree.children(&container.id);
        let painted = children
            .iter()
            .map(judges::visible)
            .filter(|report| report.ok)
            .count();
        (painted > 0).then(|| format!("collapsed_container({} painted children)", painted))
    }
}

fn select_candidate(
    candidates: Vec<ElementSnapshot>,
    region: RegionPreference,
) -> Option<ElementSnapshot> {
    let wants_navigation = region == RegionPreference::PinNavigation;
    let (preferred, others): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|el| el.in_navigation == wants_navigation);
    let pool = if preferred.is_empty() { others } else { preferred };
    let mut fallback = None;
    for element in pool {
        if judges::visible(&element).ok {
            return Some(element);
        }
        if fallback.is_none() {
            fallback = Some(element);
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRenderTree, NodeSpec};
    use crate::model::Extent;
    use step_catalog::{Prerequisite, TargetTable};

    fn detector(tree: &Arc<MemoryRenderTree>) -> ReadinessDetector {
        ReadinessDetector::new(tree.clone())
    }

    #[test]
    fn whole_screen_is_always_ready() {
        let tree = MemoryRenderTree::new();
        assert!(detector(&tree).measure(&Target::WholeScreen).ready);
    }

    #[test]
    fn missing_element_reports_reason() {
        let tree = MemoryRenderTree::new();
        let readiness = detector(&tree).measure(&Target::css("#missing-panel"));
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("missing(#missing-panel)"));
    }

    #[test]
    fn reflow_runs_before_every_measure() {
        let tree = MemoryRenderTree::new();
        tree.insert(NodeSpec::new("a", "#a"));
        let detector = detector(&tree);
        detector.measure(&Target::css("#a"));
        detector.measure(&Target::css("#a"));
        assert_eq!(tree.reflow_count(), 2);
    }

    #[test]
    fn content_wins_over_navigation_duplicate() {
        let tree = MemoryRenderTree::new();
        tree.insert(NodeSpec::new("nav", "[data-tour='formats']").in_navigation());
        tree.insert(NodeSpec::new("content", "[data-tour='formats']"));
        let selector = TargetTable::new()
            .define("formats", ["[data-tour='formats']"])
            .resolve("formats")
            .unwrap();

        let picked = detector(&tree).resolve(&selector).unwrap();
        assert_eq!(picked.id.0, "content");

        let pinned = selector.with_region(RegionPreference::PinNavigation);
        assert_eq!(detector(&tree).resolve(&pinned).unwrap().id.0, "nav");
    }

    #[test]
    fn navigation_only_match_is_used_when_nothing_better_exists() {
        let tree = MemoryRenderTree::new();
        tree.insert(NodeSpec::new("nav", "[data-tour='formats']").in_navigation());
        let target = Target::css("[data-tour='formats']");
        assert!(detector(&tree).measure(&target).ready);
    }

    #[test]
    fn later_selectors_are_fallbacks() {
        let tree = MemoryRenderTree::new();
        tree.insert(NodeSpec::new("bare", "[data-tour='upcoming-events']"));
        let selector = TargetTable::new()
            .define(
                "upcoming-events",
                ["#main-content [data-tour='upcoming-events']", "[data-tour='upcoming-events']"],
            )
            .resolve("upcoming-events")
            .unwrap();
        assert_eq!(detector(&tree).resolve(&selector).unwrap().id.0, "bare");
    }

    #[test]
    fn collapsed_flex_container_with_painted_child_is_ready() {
        let tree = MemoryRenderTree::new();
        tree.insert(
            NodeSpec::new("stats", "#dashboard-stats")
                .display("flex")
                .extent(Extent::ZERO),
        );
        tree.insert(NodeSpec::new("card", ".stat-card").child_of("stats"));

        let readiness = detector(&tree).measure(&Target::css("#dashboard-stats"));
        assert!(readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("collapsed_container(1 painted children)")
        );
    }

    #[test]
    fn collapsed_block_or_hidden_children_are_not_ready() {
        let tree = MemoryRenderTree::new();
        tree.insert(NodeSpec::new("block", "#block").extent(Extent::ZERO));
        tree.insert(NodeSpec::new("child", ".c").child_of("block"));
        tree.insert(NodeSpec::new("grid", "#grid").display("grid").extent(Extent::ZERO));
        tree.insert(NodeSpec::new("gone", ".g").child_of("grid").hidden());

        let detector = detector(&tree);
        assert!(!detector.measure(&Target::css("#block")).ready);
        assert!(!detector.measure(&Target::css("#grid")).ready);
    }

    #[test]
    fn tab_gated_targets_are_deferred_but_toggles_are_not() {
        let tree = MemoryRenderTree::new();
        let gates = GateTable::new()
            .with_prerequisite(Prerequisite::tab("participants-tab", "#tab-participants"))
            .with_prerequisite(Prerequisite::toggle("booking", "#booking-toggle"))
            .with_rule("#participants", "participants-tab")
            .with_rule("#booking-settings", "booking");
        let detector = detector(&tree);

        let deferred = detector.check(&Target::css("#participants"), &gates);
        assert!(deferred.ready);
        assert_eq!(deferred.reason.as_deref(), Some("deferred"));
        assert!(!detector.measure(&Target::css("#participants")).ready);
        assert!(!detector.check(&Target::css("#booking-settings"), &gates).ready);
    }
}
