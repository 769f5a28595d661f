//! Minimal Markdown to HTML rendering for reader-proxy output.
//!
//! Covers headings, lists, block quotes, fenced code, paragraphs, and the inline forms
//! code span, image, link, bold and italic. The result is always sanitized.

use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::links::LinkAbsolutizer;
use crate::sanitize::HtmlSanitizer;

// Private-use delimiters; they survive escaping untouched.
const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid code span regex"));

/// A link destination; one level of balanced parentheses is allowed inside it.
const DESTINATION: &str = r"(?:[^()\s<>]|\([^()\s<>]*\))+";

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"!\[([^\]\n]*)\]\(\s*<?({DESTINATION})>?(?:\s+"[^"\n]*")?\s*\)"#))
        .expect("valid image regex")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"\[([^\]\n]+)\]\(\s*<?({DESTINATION})>?(?:\s+"[^"\n]*")?\s*\)"#))
        .expect("valid link regex")
});

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").expect("valid bold regex"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").expect("valid italic regex"));

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("valid heading regex")
});

static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid list regex"));

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,9})[.)]\s+(.*)$").expect("valid list regex"));

static QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s?(.*)$").expect("valid quote regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

#[derive(Debug)]
enum OpenBlock {
    None,
    Paragraph(Vec<String>),
    Quote(Vec<String>),
    List(ListKind),
}

/// Renders Markdown into a sanitized fragment with absolute links.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    links: LinkAbsolutizer,
    sanitizer: HtmlSanitizer,
}

impl MarkdownRenderer {
    /// Creates a renderer resolving links against `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            links: LinkAbsolutizer::new(base_url),
            sanitizer: HtmlSanitizer::markdown(),
        }
    }

    /// Renders `markdown`.
    #[must_use]
    pub fn render(&self, markdown: &str) -> String {
        let mut html = String::new();
        let mut open = OpenBlock::None;
        let mut lines = markdown.lines();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();

            if trimmed.starts_with("```") {
                self.close(&mut open, &mut html);
                let code: Vec<&str> = lines
                    .by_ref()
                    .take_while(|inner| !inner.trim_start().starts_with("```"))
                    .collect();
                html.push_str("<pre><code>");
                html.push_str(&encode_text(&code.join("\n")));
                html.push_str("</code></pre>");
                continue;
            }

            if trimmed.is_empty() {
                self.close(&mut open, &mut html);
                continue;
            }

            if let Some(caps) = HEADING.captures(line) {
                self.close(&mut open, &mut html);
                let level = caps[1].len();
                html.push_str(&format!("<h{level}>{}</h{level}>", self.inline(&caps[2])));
            } else if is_thematic_break(trimmed) {
                self.close(&mut open, &mut html);
                html.push_str("<hr>");
            } else if let Some(caps) = UNORDERED_ITEM.captures(line) {
                self.open_list(ListKind::Unordered, None, &mut open, &mut html);
                html.push_str(&format!("<li>{}</li>", self.inline(&caps[1])));
            } else if let Some(caps) = ORDERED_ITEM.captures(line) {
                let start = caps[1].parse::<u32>().ok();
                self.open_list(ListKind::Ordered, start, &mut open, &mut html);
                html.push_str(&format!("<li>{}</li>", self.inline(&caps[2])));
            } else if let Some(caps) = QUOTE.captures(line) {
                if !matches!(open, OpenBlock::Quote(_)) {
                    self.close(&mut open, &mut html);
                    open = OpenBlock::Quote(Vec::new());
                }
                if let OpenBlock::Quote(ref mut quoted) = open {
                    quoted.push(caps[1].trim().to_string());
                }
            } else {
                if !matches!(open, OpenBlock::Paragraph(_)) {
                    self.close(&mut open, &mut html);
                    open = OpenBlock::Paragraph(Vec::new());
                }
                if let OpenBlock::Paragraph(ref mut para) = open {
                    para.push(trimmed.to_string());
                }
            }
        }
        self.close(&mut open, &mut html);

        self.sanitizer.clean(&html)
    }

    fn open_list(&self, kind: ListKind, start: Option<u32>, open: &mut OpenBlock, html: &mut String) {
        if matches!(*open, OpenBlock::List(current) if current == kind) {
            return;
        }
        self.close(open, html);
        match (kind, start) {
            (ListKind::Unordered, _) => html.push_str("<ul>"),
            (ListKind::Ordered, Some(n)) if n != 1 => html.push_str(&format!("<ol start=\"{n}\">")),
            (ListKind::Ordered, _) => html.push_str("<ol>"),
        }
        *open = OpenBlock::List(kind);
    }

    fn close(&self, open: &mut OpenBlock, html: &mut String) {
        match std::mem::replace(open, OpenBlock::None) {
            OpenBlock::None => {}
            OpenBlock::Paragraph(lines) => {
                html.push_str(&format!("<p>{}</p>", self.inline(&lines.join(" "))));
            }
            OpenBlock::Quote(lines) => {
                let text = lines.join(" ");
                if text.trim().is_empty() {
                    html.push_str("<blockquote></blockquote>");
                } else {
                    html.push_str(&format!("<blockquote><p>{}</p></blockquote>", self.inline(&text)));
                }
            }
            OpenBlock::List(ListKind::Unordered) => html.push_str("</ul>"),
            OpenBlock::List(ListKind::Ordered) => html.push_str("</ol>"),
        }
    }

    /// Renders inline markup.
    ///
    /// Code spans, images and links are parked in slots before escaping so their
    /// punctuation is never read as emphasis; slots are restored last.
    fn inline(&self, text: &str) -> String {
        let mut slots = Slots::default();

        let text = CODE_SPAN.replace_all(text, |caps: &Captures<'_>| {
            slots.park(format!("<code>{}</code>", encode_text(&caps[1])))
        });

        let text = IMAGE.replace_all(&text, |caps: &Captures<'_>| {
            let src = self.links.resolve(&caps[2]);
            slots.park(format!(
                "<img src=\"{}\" alt=\"{}\">",
                encode_double_quoted_attribute(&src),
                encode_double_quoted_attribute(&caps[1])
            ))
        });

        let text = LINK.replace_all(&text, |caps: &Captures<'_>| {
            let href = self.links.resolve(&caps[2]);
            let label = emphasize(&encode_text(&caps[1]));
            slots.park(format!(
                "<a href=\"{}\">{label}</a>",
                encode_double_quoted_attribute(&href)
            ))
        });

        let escaped = encode_text(&text);
        slots.restore(&emphasize(&escaped))
    }
}

fn emphasize(escaped: &str) -> String {
    let bold = BOLD.replace_all(escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

fn is_thematic_break(line: &str) -> bool {
    let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3
        && matches!(marks[0], '-' | '*' | '_')
        && marks.iter().all(|c| *c == marks[0])
}

#[derive(Debug, Default)]
struct Slots {
    parked: Vec<String>,
}

impl Slots {
    fn park(&mut self, html: String) -> String {
        let token = format!("{SLOT_OPEN}{}{SLOT_CLOSE}", self.parked.len());
        self.parked.push(html);
        token
    }

    fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        // Later slots may contain earlier ones (a linked image), so unwind from the end.
        for (i, html) in self.parked.iter().enumerate().rev() {
            out = out.replace(&format!("{SLOT_OPEN}{i}{SLOT_CLOSE}"), html);
        }
        out
    }
}

/// Renders `markdown` with links resolved against `base_url`.
#[must_use]
pub fn render_markdown(markdown: &str, base_url: &str) -> String {
    MarkdownRenderer::new(base_url).render(markdown)
}
