//! A thin document model over `scraper`.
//!
//! Scoring and classification only talk to [`ContentNode`], so the parser behind
//! [`Document`] can be swapped without touching them.

mod serialize;

pub use serialize::{serialize_children, serialize_element, ElementAction, NodeFilter, PassThrough};

use scraper::{ElementRef, Html, Selector};

use crate::errors::ExtractError;

/// Read-only capabilities the extractor needs from an element.
pub trait ContentNode {
    /// Lower-case tag name.
    fn tag_name(&self) -> &str;

    /// Attribute value, if present.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Concatenated descendant text with whitespace runs collapsed to one space.
    fn text_content(&self) -> String;

    /// Number of descendant elements whose tag is in `tags`.
    fn count_descendants(&self, tags: &[&str]) -> usize;

    /// Whether any child is an element (as opposed to bare text).
    fn has_element_children(&self) -> bool;

    /// Whether an ancestor is one of `tags` or carries one of `roles`.
    fn has_ancestor(&self, tags: &[&str], roles: &[String]) -> bool;
}

impl ContentNode for ElementRef<'_> {
    fn tag_name(&self) -> &str {
        self.value().name()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn text_content(&self) -> String {
        collapse_whitespace(self.text())
    }

    fn count_descendants(&self, tags: &[&str]) -> usize {
        self.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| tags.contains(&el.value().name()))
            .count()
    }

    fn has_element_children(&self) -> bool {
        self.children().any(|child| child.value().is_element())
    }

    fn has_ancestor(&self, tags: &[&str], roles: &[String]) -> bool {
        self.ancestors().filter_map(ElementRef::wrap).any(|el| {
            tags.contains(&el.value().name())
                || el
                    .value()
                    .attr("role")
                    .is_some_and(|role| roles.iter().any(|r| r.eq_ignore_ascii_case(role.trim())))
        })
    }
}

/// Concatenates text pieces, then collapses every whitespace run to a single space.
///
/// Pieces are joined as-is, so inline element boundaries add no spacing.
pub fn collapse_whitespace<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    let joined: String = pieces.collect();
    let mut out = String::with_capacity(joined.len());
    for word in joined.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Compiles a CSS selector, mapping failures to [`ExtractError::InvalidSelector`].
pub fn compile_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::InvalidSelector(selector.to_string()))
}

/// Compiles a list of selectors, preserving order.
pub fn compile_selectors(selectors: &[String]) -> Result<Vec<Selector>, ExtractError> {
    selectors.iter().map(|s| compile_selector(s)).collect()
}

/// A parsed HTML document or fragment that supports node removal.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full document.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Parses a fragment in `<body>` context.
    #[must_use]
    pub fn parse_fragment(html: &str) -> Self {
        Self {
            html: Html::parse_fragment(html),
        }
    }

    /// The root `<html>` element.
    #[must_use]
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// The `<body>` element, if the parser produced one.
    #[must_use]
    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.root()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
    }

    /// Elements matching `selector` that are still attached, in document order.
    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> impl Iterator<Item = ElementRef<'a>> + 'b
    where
        'a: 'b,
    {
        // Html::select walks the whole arena, detached nodes included.
        self.root().select(selector)
    }

    /// Detaches every element matching `selector`. Returns how many were removed.
    pub fn remove_matching(&mut self, selector: &Selector) -> usize {
        let ids: Vec<_> = self.select(selector).map(|el| el.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids.len()
    }

    /// Detaches the first element matching `selector`, if any.
    pub fn remove_first(&mut self, selector: &Selector) -> bool {
        let Some(id) = self.select(selector).next().map(|el| el.id()) else {
            return false;
        };
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
        true
    }

    /// Serializes the children of the root element through `filter`.
    ///
    /// For a fragment this is the fragment itself without any wrapper.
    #[must_use]
    pub fn fragment_html(&self, filter: &dyn NodeFilter) -> String {
        serialize_children(self.root(), filter)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_content_collapses_whitespace() {
        let doc = Document::parse("<div id=x>  Hello \n\n <b>big</b>\tworld  </div>");
        let sel = compile_selector("#x").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(el.text_content(), "Hello big world");
    }

    #[test]
    fn test_text_content_adds_no_space_at_inline_boundaries() {
        let doc = Document::parse("<p id=x>a<b>b</b>c</p><p id=y>\u{4e2d}\u{6587}<b>\u{52a0}\u{7c97}</b>\u{6587}\u{5b57}<a>\u{94fe}\u{63a5}</a>\u{3002}</p>");
        let x = compile_selector("#x").unwrap();
        let el = doc.select(&x).next().unwrap();
        assert_eq!(el.text_content(), "abc");
        assert_eq!(el.text_content().chars().count(), 3);

        let y = compile_selector("#y").unwrap();
        let el = doc.select(&y).next().unwrap();
        assert_eq!(el.text_content().chars().count(), 9);
    }

    #[test]
    fn test_count_descendants() {
        let doc = Document::parse("<article><p>a</p><div><p>b</p><h2>c</h2></div><h3>d</h3></article>");
        let sel = compile_selector("article").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(el.count_descendants(&["p"]), 2);
        assert_eq!(el.count_descendants(&["h2", "h3", "h4"]), 2);
        assert_eq!(el.count_descendants(&["article"]), 0);
    }

    #[test]
    fn test_removed_nodes_are_not_selected() {
        let mut doc = Document::parse("<body><nav><p>menu</p></nav><p>body</p></body>");
        let nav = compile_selector("nav").unwrap();
        assert_eq!(doc.remove_matching(&nav), 1);

        let p = compile_selector("p").unwrap();
        let texts: Vec<_> = doc.select(&p).map(|el| el.text_content()).collect();
        assert_eq!(texts, vec!["body".to_string()]);
    }

    #[test]
    fn test_remove_first_only() {
        let mut doc = Document::parse_fragment("<h1>a</h1><p>x</p><h1>b</h1>");
        let h1 = compile_selector("h1").unwrap();
        assert!(doc.remove_first(&h1));
        assert_eq!(doc.fragment_html(&PassThrough), "<p>x</p><h1>b</h1>");
    }

    #[test]
    fn test_landmark_ancestor() {
        let doc = Document::parse(
            "<div role=\"navigation\"><article>x</article></div><section><article>y</article></section>",
        );
        let sel = compile_selector("article").unwrap();
        let roles = vec!["navigation".to_string()];
        let flags: Vec<_> = doc.select(&sel).map(|el| el.has_ancestor(&["nav"], &roles)).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_body_without_element_children() {
        let doc = Document::parse("<html><body>just text</body></html>");
        let body = doc.body().unwrap();
        assert!(!body.has_element_children());
    }

    #[test]
    fn test_invalid_selector() {
        let err = compile_selector("div[").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector(_)));
    }
}
