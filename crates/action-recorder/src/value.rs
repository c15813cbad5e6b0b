//! Value extraction for plain, custom-element and shadow-hosted inputs.

use soulrecorder_dom::{normalize_space, NodeId, Page};

/// Replacement for anything typed into a password field.
pub const PASSWORD_MASK: &str = "********";

/// Resolves the current value of `element`:
///
/// 1. its own non-empty `value`
/// 2. an `input`/`textarea`/content-editable inside its open shadow root
/// 3. for custom elements, a nested input in the light DOM
/// 4. its text when it is content-editable
pub fn extract_value(page: &Page, element: NodeId) -> Option<String> {
    if let Some(value) = page.value(element).filter(|value| !value.is_empty()) {
        return Some(value);
    }
    if let Some(root) = page.open_shadow_root(element) {
        if let Some(value) = first_editable_value(page, root) {
            return Some(value);
        }
    }
    if page.element(element).map(|data| data.is_custom_element()) == Some(true) {
        let nested = page
            .descendants(element)
            .into_iter()
            .find(|candidate| matches!(page.tag(*candidate), Some("input" | "textarea")));
        if let Some(value) = nested
            .and_then(|input| page.value(input))
            .filter(|value| !value.is_empty())
        {
            return Some(value);
        }
    }
    if page.is_content_editable(element) {
        return Some(page.text_content(element));
    }
    None
}

fn first_editable_value(page: &Page, root: NodeId) -> Option<String> {
    page.descendants(root).into_iter().find_map(|candidate| {
        match page.tag(candidate) {
            Some("input" | "textarea") => Some(page.value(candidate).unwrap_or_default()),
            _ if page.is_content_editable(candidate) => Some(page.text_content(candidate)),
            _ => None,
        }
    })
}

/// True for `<input type=password>`, or a host whose shadow input is one.
pub fn is_password_field(page: &Page, element: NodeId) -> bool {
    let is_password = |id: NodeId| {
        page.tag(id) == Some("input")
            && page
                .attr(id, "type")
                .map(|kind| kind.eq_ignore_ascii_case("password"))
                .unwrap_or(false)
    };
    if is_password(element) {
        return true;
    }
    let nested_roots = page
        .open_shadow_root(element)
        .into_iter()
        .chain(std::iter::once(element));
    nested_roots
        .flat_map(|scope| page.descendants(scope))
        .any(is_password)
}

/// Value as it may be recorded: masked for password fields.
pub fn recorded_value(page: &Page, element: NodeId) -> Option<String> {
    let value = extract_value(page, element)?;
    if is_password_field(page, element) {
        Some(PASSWORD_MASK.to_string())
    } else {
        Some(value)
    }
}

/// Text used as the expected value of a text assertion. Shadow hosts are
/// read through their root since the target is rarely an input.
pub fn assertion_text(page: &Page, element: NodeId) -> String {
    if let Some(value) = recorded_value(page, element).filter(|value| !value.trim().is_empty()) {
        return normalize_space(&value);
    }
    let mut text = normalize_space(&page.text_content(element));
    if let Some(root) = page.open_shadow_root(element) {
        let inner = normalize_space(&page.text_content(root));
        if !inner.is_empty() {
            text = if text.is_empty() {
                inner
            } else {
                format!("{text} {inner}")
            };
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(html: &str) -> Page {
        Page::parse(html, "https://a.example/").unwrap()
    }

    fn find(page: &Page, xpath: &str) -> NodeId {
        let doc = page.document(page.top_window());
        page.evaluate_xpath(xpath, doc).unwrap()[0]
    }

    #[test]
    fn direct_value_wins() {
        let mut page = page(r#"<input value="x">"#);
        let input = find(&page, "//input");
        assert_eq!(extract_value(&page, input).as_deref(), Some("x"));
        page.set_value(input, "typed").unwrap();
        assert_eq!(extract_value(&page, input).as_deref(), Some("typed"));
    }

    #[test]
    fn shadow_hosted_input() {
        let mut page = page(
            r#"<x-text><template shadowrootmode="open"><label>Name</label><input></template></x-text>"#,
        );
        let host = find(&page, "//x-text");
        let root = page.open_shadow_root(host).unwrap();
        let input = page.evaluate_xpath(".//input", root).unwrap()[0];
        page.set_value(input, "Ada").unwrap();
        assert_eq!(extract_value(&page, host).as_deref(), Some("Ada"));
    }

    #[test]
    fn custom_element_light_dom_input() {
        let page = page(r#"<my-field><span><input value="light"></span></my-field>"#);
        let host = find(&page, "//my-field");
        assert_eq!(extract_value(&page, host).as_deref(), Some("light"));
    }

    #[test]
    fn empty_nested_input_falls_through_to_editable_text() {
        let mut page = page(r#"<rich-note contenteditable="true">Draft<input></rich-note>"#);
        let host = find(&page, "//rich-note");
        let input = find(&page, "//input");
        page.set_value(input, "").unwrap();
        assert_eq!(extract_value(&page, host).as_deref(), Some("Draft"));
    }

    #[test]
    fn content_editable_text() {
        let page = page(r#"<div contenteditable="true">Hello <b>world</b></div>"#);
        let div = find(&page, "//div");
        assert_eq!(extract_value(&page, div).as_deref(), Some("Hello world"));
    }

    #[test]
    fn plain_element_has_no_value() {
        let page = page("<p>text</p>");
        assert_eq!(extract_value(&page, find(&page, "//p")), None);
    }

    #[test]
    fn password_is_masked() {
        let mut page = page(r#"<input type="password">"#);
        let input = find(&page, "//input");
        page.set_value(input, "hunter2").unwrap();
        assert_eq!(recorded_value(&page, input).as_deref(), Some(PASSWORD_MASK));
    }

    #[test]
    fn shadow_password_is_masked_on_the_host() {
        let mut page = page(
            r#"<x-secret><template shadowrootmode="open"><input type="password"></template></x-secret>"#,
        );
        let host = find(&page, "//x-secret");
        let root = page.open_shadow_root(host).unwrap();
        let input = page.element_children(root)[0];
        page.set_value(input, "s3cret").unwrap();
        assert_eq!(recorded_value(&page, host).as_deref(), Some(PASSWORD_MASK));
    }

    #[test]
    fn assertion_text_reads_shadow_root() {
        let page = page(
            r#"<x-total><template shadowrootmode="open"><span>Total: $42</span></template></x-total>"#,
        );
        let host = find(&page, "//x-total");
        assert_eq!(assertion_text(&page, host), "Total: $42");
    }
}
