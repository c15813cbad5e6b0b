//! Human-readable action summaries. Cosmetic only: nothing downstream may
//! identify elements by these strings.

use soulrecorder_dom::{normalize_space, NodeId, Page};

use crate::model::{ActionKind, AssertionType, ValuePayload};

const LABEL_LIMIT: usize = 50;

/// Visible text, else aria-label, placeholder, name, id, else the tag.
pub fn element_label(page: &Page, element: NodeId) -> String {
    let text = normalize_space(&page.text_content(element));
    let label = if !text.is_empty() {
        text
    } else {
        ["aria-label", "placeholder", "name", "id"]
            .iter()
            .find_map(|attr| {
                page.attr(element, attr)
                    .map(normalize_space)
                    .filter(|value| !value.is_empty())
            })
            .unwrap_or_else(|| page.tag(element).unwrap_or("element").to_string())
    };
    truncate(&label, LABEL_LIMIT)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push('…');
    out
}

fn is_button_like(page: &Page, element: NodeId) -> bool {
    if page.attr(element, "role") == Some("button") {
        return true;
    }
    match page.tag(element) {
        Some("button") => true,
        Some("input") => matches!(
            page.attr(element, "type").map(str::to_ascii_lowercase).as_deref(),
            Some("submit" | "button" | "reset")
        ),
        _ => false,
    }
}

fn is_link(page: &Page, element: NodeId) -> bool {
    page.tag(element) == Some("a") || page.attr(element, "role") == Some("link")
}

pub fn describe(page: &Page, element: NodeId, kind: ActionKind, payload: &ValuePayload) -> String {
    let label = element_label(page, element);
    match (kind, payload) {
        (ActionKind::Click, _) if is_button_like(page, element) => {
            format!("Clicked the \"{label}\" button")
        }
        (ActionKind::Click, _) if is_link(page, element) => format!("Clicked the \"{label}\" link"),
        (ActionKind::Click, _) => format!("Clicked \"{label}\""),
        (ActionKind::Input, ValuePayload::Text { value }) => {
            format!("Entered \"{}\" into \"{label}\"", truncate(value, LABEL_LIMIT))
        }
        (ActionKind::Select, ValuePayload::Selected { label: option, .. }) => {
            format!("Selected \"{option}\" in \"{label}\"")
        }
        (ActionKind::Check, ValuePayload::Checked { checked: true }) => format!("Checked \"{label}\""),
        (ActionKind::Check, ValuePayload::Checked { checked: false }) => {
            format!("Unchecked \"{label}\"")
        }
        (ActionKind::Keypress, ValuePayload::Key { key }) => format!("Pressed {key} in \"{label}\""),
        (
            ActionKind::Assertion,
            ValuePayload::Assertion {
                assertion_type: AssertionType::Text,
                expected_value,
            },
        ) => format!(
            "Verified \"{label}\" contains \"{}\"",
            truncate(expected_value.as_deref().unwrap_or_default(), LABEL_LIMIT)
        ),
        (ActionKind::Assertion, _) => format!("Verified \"{label}\" is present"),
        (kind, _) => format!("{kind} on \"{label}\""),
    }
}

pub fn describe_page(url: &str) -> String {
    format!("Opened {url}")
}
