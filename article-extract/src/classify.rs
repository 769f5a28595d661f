//! Decides how a proxy's response body should be interpreted.
//!
//! Order of checks: JSON envelope, HTML markup, Markdown-like text (typically from a
//! reader proxy that prefixes a `Title:` / `URL Source:` header), then plain text.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::errors::ExtractError;

const MARKDOWN_MARKER: &str = "Markdown Content:";
const HEADER_PREFIXES: &[&str] = &["Title:", "URL Source:", "Published Time:"];

/// A classified response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Markup for the readability extractor.
    Html(String),
    /// Markdown with any reader-proxy header removed.
    Markdown(String),
    /// Text with no recognizable structure.
    PlainText(String),
    /// Nothing but whitespace.
    Empty,
}

impl Payload {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Html(_) => "html",
            Self::Markdown(_) => "markdown",
            Self::PlainText(_) => "plain_text",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    contents: Option<String>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvelopeError {
    Message(String),
    Detailed { message: String },
    Other(serde_json::Value),
}

impl EnvelopeError {
    fn into_message(self) -> String {
        match self {
            Self::Message(m) | Self::Detailed { message: m } => m,
            Self::Other(v) => v.to_string(),
        }
    }
}

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9-]*[\s/>]").expect("valid tag regex"));

static MARKDOWN_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s{0,3}#{1,6}\s+\S|^\s*(?:[-*+]|\d+\.)\s+\S|^\s*>|!?\[[^\]\n]*\]\([^)\n]+\)")
        .expect("valid markdown regex")
});

static BROKEN_DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\s\u{00A0}])\u{FFFD}([\s\u{00A0}])").expect("valid dash regex")
});

/// Restores em dashes that a proxy decoded as U+FFFD between two spaces.
#[must_use]
pub fn repair_broken_dashes(text: &str) -> String {
    if !text.contains('\u{FFFD}') {
        return text.to_string();
    }
    BROKEN_DASH.replace_all(text, "${1}\u{2014}${2}").into_owned()
}

/// Classifies a response body.
///
/// A JSON envelope's `contents` is classified recursively; its `error` fails the
/// attempt immediately.
pub fn classify(text: &str) -> Result<Payload, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Payload::Empty);
    }

    if trimmed.starts_with('{') {
        if let Ok(envelope) = serde_json::from_str::<Envelope>(trimmed) {
            return unwrap_envelope(envelope);
        }
    }

    if HTML_TAG.is_match(trimmed) {
        return Ok(Payload::Html(trimmed.to_string()));
    }

    let (body, had_marker) = strip_reader_header(trimmed);
    if body.trim().is_empty() {
        return Ok(Payload::Empty);
    }
    if had_marker || MARKDOWN_SYNTAX.is_match(&body) {
        return Ok(Payload::Markdown(body));
    }

    Ok(Payload::PlainText(body))
}

fn unwrap_envelope(envelope: Envelope) -> Result<Payload, ExtractError> {
    match envelope {
        Envelope {
            contents: Some(contents),
            ..
        } if !contents.trim().is_empty() => classify(&contents),
        Envelope {
            error: Some(error), ..
        } => Err(ExtractError::Envelope(error.into_message())),
        _ => Err(ExtractError::ClassificationEmpty(
            "proxy envelope carried no contents".to_string(),
        )),
    }
}

/// Removes a reader-proxy header. Returns the remaining text and whether the
/// `Markdown Content:` marker was present.
#[must_use]
pub fn strip_reader_header(text: &str) -> (String, bool) {
    let (body, had_marker) = match text.find(MARKDOWN_MARKER) {
        Some(pos) => (&text[pos + MARKDOWN_MARKER.len()..], true),
        None => (text, false),
    };

    let kept: Vec<&str> = body
        .lines()
        .skip_while(|line| {
            let line = line.trim_start();
            line.is_empty() || HEADER_PREFIXES.iter().any(|p| line.starts_with(p))
        })
        .collect();

    (kept.join("\n").trim().to_string(), had_marker)
}
