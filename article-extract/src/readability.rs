//! Readability-style main content selection.
//!
//! The document is stripped of structural noise, then every element matched by the
//! configured content selectors is scored:
//!
//! ```text
//! score = T + 80·P + 30·min(S, 40) + 40·H + 25·I − 25·max(0, L − 2·P)
//! ```
//!
//! where `T` is visible text length, `P` paragraphs, `S` sentence terminators, `H`
//! `h2`–`h4` headings, `I` images and `L` list items (weights from [`ScoringWeights`]).
//! The best candidate wins; if none has more visible text than the minimum bar the best `<table>` and
//! then the cleaned `<body>` are tried.

use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::config::{ExtractionConfig, ScoringWeights};
use crate::dom::{
    compile_selector, compile_selectors, serialize_children, serialize_element, ContentNode, Document,
};
use crate::errors::ExtractError;
use crate::links::LinkAbsolutizer;

const LANDMARK_TAGS: &[&str] = &["nav", "header", "footer"];
const HEADING_TAGS: &[&str] = &["h2", "h3", "h4"];
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Structural counts for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateMetrics {
    /// Visible text length in characters, whitespace collapsed.
    pub text_len: usize,
    /// `<p>` descendants.
    pub paragraphs: usize,
    /// `<h2>`..`<h4>` descendants.
    pub headings: usize,
    /// `<img>` descendants.
    pub images: usize,
    /// Sentence terminators in the visible text.
    pub sentences: usize,
    /// `<li>` descendants.
    pub list_items: usize,
}

impl CandidateMetrics {
    /// Measures `node`.
    pub fn measure(node: &impl ContentNode) -> Self {
        let text = node.text_content();
        Self {
            text_len: text.chars().count(),
            paragraphs: node.count_descendants(&["p"]),
            headings: node.count_descendants(HEADING_TAGS),
            images: node.count_descendants(&["img"]),
            sentences: text.chars().filter(|c| SENTENCE_TERMINATORS.contains(c)).count(),
            list_items: node.count_descendants(&["li"]),
        }
    }

    /// Applies the scoring function.
    #[must_use]
    pub fn score(&self, weights: &ScoringWeights) -> f64 {
        let excess_items = self
            .list_items
            .saturating_sub(weights.list_paragraph_ratio * self.paragraphs);

        self.text_len as f64
            + weights.paragraph * self.paragraphs as f64
            + weights.sentence * self.sentences.min(weights.sentence_cap) as f64
            + weights.heading * self.headings as f64
            + weights.image * self.images as f64
            - weights.list_penalty * excess_items as f64
    }
}

/// Where the winning region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Matched the content selector at this index.
    Selector(usize),
    /// The table fallback.
    Table,
    /// The body fallback.
    Body,
}

/// A scored region of the document.
#[derive(Debug, Clone)]
pub struct ContentCandidate<'a> {
    /// The element.
    pub element: ElementRef<'a>,
    /// How it scored.
    pub score: f64,
    /// What was measured.
    pub metrics: CandidateMetrics,
    /// Which rule produced it.
    pub source: CandidateSource,
}

/// Selects the main content of an HTML document.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    config: ExtractionConfig,
    content_selectors: Vec<Selector>,
    noise_selectors: Vec<Selector>,
    table_selector: Selector,
}

impl ReadabilityExtractor {
    /// Compiles the configured selector lists.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let content_selectors = compile_selectors(&config.content_selectors)?;
        let mut noise_selectors = compile_selectors(&config.noise_selectors)?;
        noise_selectors.extend(compile_selectors(&config.navigation_hint_selectors)?);

        Ok(Self {
            content_selectors,
            noise_selectors,
            table_selector: compile_selector("table")?,
            config,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Returns the main content of `html` as a fragment with absolute links.
    pub fn extract(&self, html: &str, url: &str) -> Result<String, ExtractError> {
        let mut doc = Document::parse(html);
        let removed = self.strip_noise(&mut doc);

        let Some(candidate) = self.select_candidate(&doc) else {
            debug!(url, removed, "No content candidate cleared the minimum bar");
            return Err(ExtractError::ExtractionEmpty);
        };

        debug!(
            url,
            removed,
            source = ?candidate.source,
            score = candidate.score,
            text_len = candidate.metrics.text_len,
            "Selected content candidate"
        );

        let absolutizer = LinkAbsolutizer::new(url);
        let fragment = match candidate.source {
            // Table rows only parse inside a table, so keep the wrapper.
            CandidateSource::Table => serialize_element(candidate.element, &absolutizer),
            _ => serialize_children(candidate.element, &absolutizer),
        };

        if fragment.trim().is_empty() {
            return Err(ExtractError::ExtractionEmpty);
        }
        Ok(fragment)
    }

    /// Detaches noise and navigation elements. Returns how many were removed.
    pub fn strip_noise(&self, doc: &mut Document) -> usize {
        self.noise_selectors
            .iter()
            .map(|selector| doc.remove_matching(selector))
            .sum()
    }

    /// Picks the best region of an already-cleaned document.
    pub fn select_candidate<'d>(&self, doc: &'d Document) -> Option<ContentCandidate<'d>> {
        self.best_selector_candidate(doc)
            .or_else(|| self.best_table(doc))
            .or_else(|| self.body_fallback(doc))
    }

    fn best_selector_candidate<'d>(&self, doc: &'d Document) -> Option<ContentCandidate<'d>> {
        let mut best: Option<ContentCandidate<'d>> = None;

        for (index, selector) in self.content_selectors.iter().enumerate() {
            for element in doc.select(selector) {
                if element.has_ancestor(LANDMARK_TAGS, &self.config.landmark_roles) {
                    continue;
                }
                let candidate = self.score(element, CandidateSource::Selector(index));
                if candidate.metrics.text_len <= self.config.min_candidate_text {
                    continue;
                }
                keep_better(&mut best, candidate);
            }
        }

        best
    }

    fn best_table<'d>(&self, doc: &'d Document) -> Option<ContentCandidate<'d>> {
        let mut best = None;
        for element in doc.select(&self.table_selector) {
            let candidate = self.score(element, CandidateSource::Table);
            if candidate.metrics.text_len <= self.config.min_table_text {
                continue;
            }
            keep_better(&mut best, candidate);
        }
        best
    }

    fn body_fallback<'d>(&self, doc: &'d Document) -> Option<ContentCandidate<'d>> {
        let body = doc.body()?;
        // Bare text belongs to the plain-text path upstream.
        if !body.has_element_children() {
            return None;
        }
        let candidate = self.score(body, CandidateSource::Body);
        (candidate.metrics.text_len > self.config.min_body_text).then_some(candidate)
    }

    fn score<'d>(&self, element: ElementRef<'d>, source: CandidateSource) -> ContentCandidate<'d> {
        let metrics = CandidateMetrics::measure(&element);
        ContentCandidate {
            element,
            score: metrics.score(&self.config.weights),
            metrics,
            source,
        }
    }
}

/// Ties keep the earlier candidate.
fn keep_better<'d>(best: &mut Option<ContentCandidate<'d>>, candidate: ContentCandidate<'d>) {
    if best.as_ref().map_or(true, |b| candidate.score > b.score) {
        *best = Some(candidate);
    }
}
