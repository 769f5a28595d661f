//! HTML serialization with per-element and per-attribute hooks.

use scraper::{ElementRef, Node};
use std::borrow::Cow;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

/// What to do with an element during serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    /// Emit the element and its subtree.
    Keep,
    /// Emit the subtree without the element's own tags.
    Unwrap,
    /// Emit nothing.
    Drop,
}

/// Hooks consulted while serializing.
pub trait NodeFilter {
    /// Decides how an element is emitted.
    fn element(&self, _el: ElementRef<'_>) -> ElementAction {
        ElementAction::Keep
    }

    /// Rewrites an attribute value. `None` drops the attribute.
    fn attribute<'v>(&self, _tag: &str, _name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        Some(Cow::Borrowed(value))
    }

    /// Attributes appended after the element's own.
    fn extra_attributes(&self, _tag: &str) -> &[(&'static str, &'static str)] {
        &[]
    }
}

/// Serializes everything unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl NodeFilter for PassThrough {}

/// Serializes the children of `el`.
#[must_use]
pub fn serialize_children(el: ElementRef<'_>, filter: &dyn NodeFilter) -> String {
    let mut out = String::new();
    write_children(el, filter, &mut out);
    out
}

/// Serializes `el` itself, including its own tags.
#[must_use]
pub fn serialize_element(el: ElementRef<'_>, filter: &dyn NodeFilter) -> String {
    let mut out = String::new();
    write_element(el, filter, &mut out);
    out
}

fn write_children(el: ElementRef<'_>, filter: &dyn NodeFilter, out: &mut String) {
    let raw = RAW_TEXT_ELEMENTS.contains(&el.value().name());
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(&**text));
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_element(child_el, filter, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, filter: &dyn NodeFilter, out: &mut String) {
    match filter.element(el) {
        ElementAction::Drop => {}
        ElementAction::Unwrap => write_children(el, filter, out),
        ElementAction::Keep => {
            let tag = el.value().name();
            out.push('<');
            out.push_str(tag);
            // Attribute storage order is not guaranteed; sort for stable output.
            let mut attrs: Vec<_> = el.value().attrs().collect();
            attrs.sort_unstable_by(|a, b| a.0.cmp(b.0));
            let mut emitted = Vec::with_capacity(attrs.len());
            for (name, value) in attrs {
                if let Some(value) = filter.attribute(tag, name, value) {
                    push_attribute(out, name, &value);
                    emitted.push(name);
                }
            }
            for (name, value) in filter.extra_attributes(tag) {
                if !emitted.contains(name) {
                    push_attribute(out, name, value);
                }
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }

            write_children(el, filter, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}
