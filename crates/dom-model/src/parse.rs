//! Forgiving HTML fixture parser.
//!
//! Understands enough HTML to build realistic pages: nested elements, void
//! and raw-text elements, comments, character references, declarative
//! shadow roots (`<template shadowrootmode>`) and `srcdoc` frames.

use crate::errors::DomError;
use crate::node::{NodeId, ShadowRootMode, WindowId};
use crate::page::Page;

const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: [&str; 4] = ["script", "style", "textarea", "title"];

pub(crate) fn parse_into(
    page: &mut Page,
    parent: NodeId,
    window: WindowId,
    html: &str,
) -> Result<(), DomError> {
    let bytes = html.as_bytes();
    let mut stack: Vec<(NodeId, String)> = vec![(parent, String::new())];
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->")
                .ok_or_else(|| DomError::HtmlParse("unclosed HTML comment".into()))?;
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            let end = find_subslice(bytes, i, b">")
                .ok_or_else(|| DomError::HtmlParse("unclosed declaration".into()))?;
            i = end + 1;
            continue;
        }

        if bytes[i] == b'<' && starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;
            if let Some(position) = stack.iter().rposition(|(_, open)| *open == tag) {
                if position > 0 {
                    stack.truncate(position);
                }
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).map(|b| b.is_ascii_alphabetic()) == Some(true) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;
            let (current, _) = stack
                .last()
                .cloned()
                .ok_or_else(|| DomError::HtmlParse("invalid stack state".into()))?;

            if tag == "template" {
                let mode = attrs
                    .iter()
                    .find(|(key, _)| key == "shadowrootmode" || key == "shadowroot")
                    .map(|(_, value)| value.parse::<ShadowRootMode>())
                    .transpose()
                    .map_err(DomError::HtmlParse)?;
                if let Some(mode) = mode {
                    if !page.is_element(current) {
                        return Err(DomError::HtmlParse(
                            "declarative shadow root without a host element".into(),
                        ));
                    }
                    let root = page.attach_shadow(current, mode)?;
                    stack.push((root, tag));
                    continue;
                }
            }

            let srcdoc = attrs
                .iter()
                .find(|(key, _)| key == "srcdoc")
                .map(|(_, value)| value.clone());
            let node = page.create_element(&tag, attrs);
            page.append_silent(current, node)?;

            if RAW_TEXT_TAGS.contains(&tag.as_str()) {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| DomError::HtmlParse(format!("unclosed <{tag}>")))?;
                let raw = html.get(i..close).unwrap_or_default();
                let body = if tag == "textarea" || tag == "title" {
                    decode_character_references(raw)
                } else {
                    raw.to_string()
                };
                if !body.is_empty() {
                    let text = page.create_text(&body);
                    page.append_silent(node, text)?;
                }
                if tag == "textarea" {
                    page.set_value(node, &body)?;
                }
                let (_, after) = parse_end_tag(html, close)?;
                i = after;
                continue;
            }

            if tag == "iframe" || tag == "frame" {
                if let Some(doc) = srcdoc {
                    let origin = page.window(window).origin().to_string();
                    page.load_frame_with_origin(node, window, &doc, "about:srcdoc", origin)?;
                }
            }

            if !self_closing && !VOID_TAGS.contains(&tag.as_str()) {
                stack.push((node, tag));
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        if let Some(text) = html.get(text_start..i) {
            let (current, _) = stack
                .last()
                .cloned()
                .ok_or_else(|| DomError::HtmlParse("missing parent element".into()))?;
            let node = page.create_text(&decode_character_references(text));
            page.append_silent(current, node)?;
        }
    }

    Ok(())
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, Vec<(String, String)>, bool, usize), DomError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;
    let tag_start = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| DomError::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(DomError::HtmlParse(format!("unclosed start tag <{tag}>")));
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| DomError::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        if !attrs.iter().any(|(key, _)| *key == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String, DomError> {
    let bytes = html.as_bytes();
    match bytes.get(*i) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            let start = *i + 1;
            let end = find_subslice(bytes, start, &[quote])
                .ok_or_else(|| DomError::HtmlParse("unclosed attribute value".into()))?;
            *i = end + 1;
            Ok(decode_character_references(html.get(start..end).unwrap_or_default()))
        }
        Some(_) => {
            let start = *i;
            while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
                *i += 1;
            }
            Ok(decode_character_references(html.get(start..*i).unwrap_or_default()))
        }
        None => Err(DomError::HtmlParse("missing attribute value".into())),
    }
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize), DomError> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);
    let start = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(start..i)
        .ok_or_else(|| DomError::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();
    let close = find_subslice(bytes, i, b">")
        .ok_or_else(|| DomError::HtmlParse(format!("unclosed end tag </{tag}")))?;
    Ok((tag, close + 1))
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

pub(crate) fn decode_character_references(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';').filter(|semi| *semi <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
