// src/sanitize/inline.rs
//! Inline cleaning: the tag whitelist applied inside a kept block element.
//!
//! The HTML parser hands us decoded text, so text is re-encoded while
//! emitting and the single decode at the end brings the buffer back to
//! source-level text, exactly once. Attribute values are encoded twice so
//! they are still encoded after that decode.

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

const ALLOWED_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

/// Clean the children of `el`: keep text, `<strong>`, `<em>`/`<i>` (as
/// `<em>`) and safe anchors; unwrap every other tag. The result is
/// entity-decoded once, whitespace-collapsed and trimmed.
pub fn clean_inline(el: ElementRef<'_>) -> String {
    let mut buf = String::new();
    append_children(el, &mut buf);
    finish(&buf)
}

fn finish(buf: &str) -> String {
    let decoded = decode_html_entities(buf);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

fn append_children(el: ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => buf.push_str(&encode_text(&t.text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    append_element(child_el, buf);
                }
            }
            _ => {}
        }
    }
}

fn append_element(el: ElementRef<'_>, buf: &mut String) {
    match el.value().name() {
        "strong" => {
            buf.push_str("<strong>");
            append_children(el, buf);
            buf.push_str("</strong>");
        }
        "em" | "i" => {
            buf.push_str("<em>");
            append_children(el, buf);
            buf.push_str("</em>");
        }
        "a" => append_link(el, buf),
        // span, b, u, div, nested p ...: drop the tag, keep the content
        _ => append_children(el, buf),
    }
}

/// True for hrefs whose scheme is http, https or mailto (any case).
pub fn is_allowed_href(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    ALLOWED_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// Attribute value that survives the final decode still encoded.
fn attr_value(raw: &str) -> String {
    encode_double_quoted_attribute(&encode_double_quoted_attribute(raw)).into_owned()
}

/// Emit a kept anchor, or nothing at all (tag and text) when the href is
/// missing or uses another scheme.
fn append_link(el: ElementRef<'_>, buf: &mut String) {
    let href = match el.value().attr("href") {
        Some(h) if !h.trim().is_empty() => h,
        _ => return,
    };
    if !is_allowed_href(href) {
        return;
    }

    buf.push_str("<a href=\"");
    buf.push_str(&attr_value(href));
    buf.push('"');

    if let Some(target) = el.value().attr("target").filter(|t| !t.trim().is_empty()) {
        buf.push_str(" target=\"");
        buf.push_str(&attr_value(target));
        buf.push('"');
    }

    buf.push_str(" rel=\"noopener noreferrer\">");
    append_children(el, buf);
    buf.push_str("</a>");
}
