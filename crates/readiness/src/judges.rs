use serde_json::{json, Map as JsonMap, Value};

use crate::model::{ElementSnapshot, Extent};

#[derive(Clone, Debug)]
pub struct JudgeReport {
    pub ok: bool,
    pub reason: String,
    pub facts: Value,
    issues: Vec<String>,
}

impl JudgeReport {
    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    /// True when the only objection is a collapsed box
    pub fn only_zero_extent(&self) -> bool {
        !self.ok && self.issues.iter().all(|issue| issue == "zero_extent")
    }
}

pub fn visible(element: &ElementSnapshot) -> JudgeReport {
    let mut facts = JsonMap::new();
    let mut issues = Vec::new();

    if !element.attached {
        issues.push("detached".to_string());
    }
    if element.hidden_attribute {
        issues.push("hidden_attribute".to_string());
    }

    if element.style.hides() {
        issues.push("style_hidden".to_string());
        facts.insert(
            "style".into(),
            json!({
                "display": element.style.display,
                "visibility": element.style.visibility,
            }),
        );
    }

    facts.insert(
        "extents".into(),
        json!({
            "bounding": extent_fact(&element.bounding),
            "scroll": extent_fact(&element.scroll),
            "client": extent_fact(&element.client),
            "offset": extent_fact(&element.offset),
        }),
    );
    if element.has_no_extent() {
        issues.push("zero_extent".to_string());
    }
    if element.in_navigation {
        facts.insert("region".into(), json!("navigation"));
    }

    let ok = issues.is_empty();
    if !ok {
        facts.insert("issues".into(), json!(issues.clone()));
    }

    let reason = format_reason(if ok { "visible" } else { "not_visible" }, &issues);

    JudgeReport {
        ok,
        reason,
        facts: Value::Object(facts),
        issues,
    }
}

fn extent_fact(extent: &Extent) -> Value {
    json!([extent.width, extent.height])
}

pub(crate) fn format_reason(base: &str, issues: &[String]) -> String {
    if issues.is_empty() {
        base.to_string()
    } else {
        format!("{}({})", base, issues.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComputedStyle, NodeId};

    fn element() -> ElementSnapshot {
        ElementSnapshot {
            id: NodeId::new("n1"),
            attached: true,
            hidden_attribute: false,
            style: ComputedStyle {
                display: "block".into(),
                visibility: "visible".into(),
            },
            bounding: Extent::new(120.0, 40.0),
            scroll: Extent::new(120.0, 40.0),
            client: Extent::new(120.0, 40.0),
            offset: Extent::new(120.0, 40.0),
            in_navigation: false,
        }
    }

    #[test]
    fn painted_element_is_visible() {
        let report = visible(&element());
        assert!(report.ok);
        assert_eq!(report.reason, "visible");
    }

    #[test]
    fn any_single_extent_is_enough() {
        let mut el = element();
        el.bounding = Extent::ZERO;
        el.client = Extent::ZERO;
        el.offset = Extent::ZERO;
        assert!(visible(&el).ok);

        el.scroll = Extent::ZERO;
        let report = visible(&el);
        assert!(!report.ok);
        assert!(report.only_zero_extent());
        assert_eq!(report.reason, "not_visible(zero_extent)");
    }

    #[test]
    fn hidden_styles_are_reported() {
        let mut el = element();
        el.style.display = "none".into();
        el.attached = false;
        let report = visible(&el);
        assert!(!report.ok);
        assert!(!report.only_zero_extent());
        assert_eq!(report.reason, "not_visible(detached,style_hidden)");
        assert_eq!(report.facts["style"]["display"], "none");
    }
}
