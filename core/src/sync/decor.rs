//! Decoration vocabulary: the class names applied to page elements and the
//! rendered tooltip body.

use crate::model::{Finding, Severity};

pub const HOVER_CLASS: &str = "vt-hover-highlight";
pub const HIGHLIGHT_CLASS: &str = "vt-vuln-highlight";
pub const ICON_CLASS: &str = "vt-vuln-icon";
pub const FLASH_CLASS: &str = "vt-jump-flash";
pub const TOOLTIP_CLASS: &str = "vt-tooltip";
pub const REPRODUCE_BUTTON_ID: &str = "vt-reproduce";

pub fn severity_class(severity: Severity) -> String {
    format!("vt-sev-{}", severity.tier())
}

pub fn icon_class(severity: Severity) -> String {
    format!("vt-icon-{}", severity.tier())
}

/// All classes a redraw may have left on an element.
pub fn strippable_classes() -> [String; 5] {
    [
        HIGHLIGHT_CLASS.to_string(),
        severity_class(Severity::High),
        severity_class(Severity::Medium),
        severity_class(Severity::Low),
        FLASH_CLASS.to_string(),
    ]
}

/// Escapes text so a stored payload cannot execute as markup inside the
/// detail popover.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the popover body: title and badges in the header, then the three
/// free-text sections with their content escaped.
pub fn render_tooltip(finding: &Finding) -> String {
    format!(
        concat!(
            "<div class=\"vt-tooltip-header\">",
            "<div class=\"vt-tooltip-title\">{title}</div>",
            "<div class=\"vt-tooltip-badges\">",
            "<span class=\"vt-tooltip-badge vt-tooltip-badge-sev-{tier}\">{severity}</span>",
            "<span class=\"vt-tooltip-badge\">{status}</span>",
            "</div></div>",
            "<div class=\"vt-tooltip-section\">",
            "<div class=\"vt-tooltip-label\">Description</div><div>{description}</div></div>",
            "<div class=\"vt-tooltip-section\">",
            "<div class=\"vt-tooltip-label\">Steps to Reproduce</div><div>{steps}</div></div>",
            "<div class=\"vt-tooltip-section\">",
            "<div class=\"vt-tooltip-label\">Payload</div><code>{payload}</code></div>",
        ),
        title = finding.vuln_type,
        tier = finding.severity.tier(),
        severity = finding.severity,
        status = finding.status,
        description = escape_html(&finding.description),
        steps = escape_html(&finding.steps),
        payload = escape_html(&finding.payload),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FindingForm, Status};

    #[test]
    fn test_escape_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>alert(1)</script> & more"),
            "&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"
        );
    }

    #[test]
    fn test_tooltip_escapes_payload_fields() {
        let mut finding = Finding::from_form(
            FindingForm {
                bug_type: Some("Stored XSS".to_string()),
                payload: Some("<img src=x onerror=alert(1)>".to_string()),
                ..Default::default()
            },
            "#comment",
            "https://example.com/post",
        );
        finding.status = Status::InProgress;
        let html = render_tooltip(&finding);
        assert!(html.contains("Stored XSS"));
        assert!(html.contains("In Progress"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_severity_keyed_classes() {
        assert_eq!(severity_class(Severity::High), "vt-sev-high");
        assert_eq!(icon_class(Severity::Medium), "vt-icon-medium");
    }
}
