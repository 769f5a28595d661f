//! Allowlist HTML sanitizer.
//!
//! Remote markup is untrusted. Anything not on the policy's allowlist is either
//! unwrapped (its text survives) or, for script-capable and embedding elements,
//! dropped together with its subtree.

use scraper::ElementRef;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::dom::{Document, ElementAction, NodeFilter};

const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "form", "svg", "math",
    "frame", "frameset", "applet", "canvas", "audio", "video", "head", "title", "meta", "link",
    "base", "button", "input", "select", "textarea",
];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

const LINK_REL: &[(&str, &str)] = &[("rel", "noopener noreferrer")];

/// Which tags and attributes survive sanitization.
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    tags: HashSet<&'static str>,
    attributes: Vec<(&'static str, &'static str)>,
}

impl SanitizePolicy {
    /// Text formatting, lists, links, images, headings, code and quotes.
    #[must_use]
    pub fn markdown() -> Self {
        let tags = [
            "p", "br", "hr", "strong", "b", "em", "i", "u", "s", "del", "code", "pre", "blockquote",
            "ul", "ol", "li", "a", "img", "h1", "h2", "h3", "h4", "h5", "h6",
        ];
        let attributes = [
            ("a", "href"),
            ("a", "title"),
            ("img", "src"),
            ("img", "alt"),
            ("img", "title"),
            ("ol", "start"),
        ];
        Self {
            tags: tags.into_iter().collect(),
            attributes: attributes.to_vec(),
        }
    }

    /// The markdown set plus the structure real articles use.
    #[must_use]
    pub fn article() -> Self {
        let mut policy = Self::markdown();
        policy.tags.extend([
            "div", "section", "span", "sub", "sup", "small", "mark", "abbr", "cite", "q", "kbd",
            "figure", "figcaption", "picture", "source", "table", "thead", "tbody", "tfoot", "tr",
            "th", "td", "caption", "colgroup", "col", "dl", "dt", "dd", "time", "address",
        ]);
        policy.attributes.extend([
            ("td", "colspan"),
            ("td", "rowspan"),
            ("th", "colspan"),
            ("th", "rowspan"),
            ("th", "scope"),
            ("source", "srcset"),
            ("source", "type"),
            ("time", "datetime"),
            ("abbr", "title"),
        ]);
        policy
    }

    /// Whether `tag` is kept.
    #[must_use]
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether `attr` on `tag` is kept.
    #[must_use]
    pub fn allows_attribute(&self, tag: &str, attr: &str) -> bool {
        self.attributes.iter().any(|&(t, a)| t == tag && a == attr)
    }
}

/// Sanitizing serializer.
#[derive(Debug, Clone)]
pub struct HtmlSanitizer {
    policy: SanitizePolicy,
}

impl HtmlSanitizer {
    /// Creates a sanitizer with `policy`.
    #[must_use]
    pub fn new(policy: SanitizePolicy) -> Self {
        Self { policy }
    }

    /// Sanitizer for rendered Markdown.
    #[must_use]
    pub fn markdown() -> Self {
        Self::new(SanitizePolicy::markdown())
    }

    /// Sanitizer for extracted article HTML.
    #[must_use]
    pub fn article() -> Self {
        Self::new(SanitizePolicy::article())
    }

    /// Sanitizes an HTML fragment.
    #[must_use]
    pub fn clean(&self, html: &str) -> String {
        Document::parse_fragment(html).fragment_html(self)
    }
}

impl NodeFilter for HtmlSanitizer {
    fn element(&self, el: ElementRef<'_>) -> ElementAction {
        let tag = el.value().name();
        if self.policy.allows_tag(tag) {
            ElementAction::Keep
        } else if DROPPED_WITH_CONTENT.contains(&tag) {
            ElementAction::Drop
        } else {
            ElementAction::Unwrap
        }
    }

    fn attribute<'v>(&self, tag: &str, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        if !self.policy.allows_attribute(tag, name) {
            return None;
        }
        if matches!(name, "href" | "src") && !is_safe_url(value) {
            return None;
        }
        Some(Cow::Borrowed(value))
    }

    fn extra_attributes(&self, tag: &str) -> &[(&'static str, &'static str)] {
        if tag == "a" {
            LINK_REL
        } else {
            &[]
        }
    }
}

/// Accepts relative references and the allowlisted schemes.
fn is_safe_url(value: &str) -> bool {
    // Browsers ignore embedded control characters and whitespace when reading a scheme.
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    match compact.split_once(':') {
        None => true,
        Some((scheme, _)) => {
            // A colon after the first path/query/fragment delimiter is not a scheme.
            if scheme.contains(['/', '?', '#']) {
                return true;
            }
            SAFE_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme))
        }
    }
}
