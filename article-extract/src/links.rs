//! Resolution of relative `href`/`src` values against the article URL.

use std::borrow::Cow;
use url::Url;

use crate::dom::{Document, NodeFilter};

/// Resolves `href` against `base`.
///
/// Empty values, fragment-only references and values that already look absolute
/// (`http…`) are returned unchanged, as is anything that fails to resolve.
#[must_use]
pub fn resolve_url<'h>(base: Option<&Url>, href: &'h str) -> Cow<'h, str> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("http") {
        return Cow::Borrowed(href);
    }
    match base.and_then(|base| base.join(trimmed).ok()) {
        Some(resolved) => Cow::Owned(resolved.into()),
        None => Cow::Borrowed(href),
    }
}

/// Serialization filter that absolutizes `a[href]` and `img[src]`.
#[derive(Debug, Clone)]
pub struct LinkAbsolutizer {
    base: Option<Url>,
}

impl LinkAbsolutizer {
    /// Creates a resolver for `base`. An unparsable base leaves links untouched.
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: Url::parse(base).ok(),
        }
    }

    /// The parsed base URL, if valid.
    #[must_use]
    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Resolves one value.
    #[must_use]
    pub fn resolve<'h>(&self, href: &'h str) -> Cow<'h, str> {
        resolve_url(self.base.as_ref(), href)
    }
}

impl NodeFilter for LinkAbsolutizer {
    fn attribute<'v>(&self, tag: &str, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        match (tag, name) {
            ("a", "href") | ("img", "src") => Some(self.resolve(value)),
            _ => Some(Cow::Borrowed(value)),
        }
    }
}

/// Absolutizes every link and image in an HTML fragment.
#[must_use]
pub fn absolutize_fragment(html: &str, base: &str) -> String {
    Document::parse_fragment(html).fragment_html(&LinkAbsolutizer::new(base))
}
