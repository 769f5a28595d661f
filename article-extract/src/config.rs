//! Configuration types for fetching, extraction and post-processing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::ExtractError;
use crate::strategy::{default_strategies, RetrievalStrategy};

/// Configuration for the proxy race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_ms: u64,
    /// Overall deadline in milliseconds.
    #[serde(default = "default_deadline")]
    pub deadline_ms: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_size")]
    pub max_response_bytes: usize,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_attempt_timeout() -> u64 {
    8_000
}

fn default_deadline() -> u64 {
    12_000
}

fn default_user_agent() -> String {
    "article-extract/0.1".to_string()
}

fn default_max_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout(),
            deadline_ms: default_deadline(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_size(),
            headers: HashMap::new(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the overall deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = duration_ms(deadline);
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Per-attempt timeout as a Duration.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Overall deadline as a Duration.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Weights for the candidate scoring function.
///
/// `score = T + paragraph*P + sentence*min(S, sentence_cap) + heading*H + image*I
///          - list_penalty*max(0, L - list_paragraph_ratio*P)`
///
/// These were calibrated by hand against real sites and are a starting point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Per `<p>`.
    #[serde(default = "default_paragraph_weight")]
    pub paragraph: f64,
    /// Per sentence terminator, up to `sentence_cap`.
    #[serde(default = "default_sentence_weight")]
    pub sentence: f64,
    /// Sentence terminators counted at most this many times.
    #[serde(default = "default_sentence_cap")]
    pub sentence_cap: usize,
    /// Per `<h2>`..`<h4>`.
    #[serde(default = "default_heading_weight")]
    pub heading: f64,
    /// Per `<img>`.
    #[serde(default = "default_image_weight")]
    pub image: f64,
    /// Per list item beyond the allowance.
    #[serde(default = "default_list_penalty")]
    pub list_penalty: f64,
    /// List items allowed per paragraph before the penalty applies.
    #[serde(default = "default_list_ratio")]
    pub list_paragraph_ratio: usize,
}

fn default_paragraph_weight() -> f64 {
    80.0
}

fn default_sentence_weight() -> f64 {
    30.0
}

fn default_sentence_cap() -> usize {
    40
}

fn default_heading_weight() -> f64 {
    40.0
}

fn default_image_weight() -> f64 {
    25.0
}

fn default_list_penalty() -> f64 {
    25.0
}

fn default_list_ratio() -> usize {
    2
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            paragraph: default_paragraph_weight(),
            sentence: default_sentence_weight(),
            sentence_cap: default_sentence_cap(),
            heading: default_heading_weight(),
            image: default_image_weight(),
            list_penalty: default_list_penalty(),
            list_paragraph_ratio: default_list_ratio(),
        }
    }
}

/// Configuration for the readability extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Candidate selectors, in priority order.
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,
    /// Elements removed before scoring.
    #[serde(default = "default_noise_selectors")]
    pub noise_selectors: Vec<String>,
    /// Navigation-looking elements removed before scoring.
    #[serde(default = "default_navigation_hints")]
    pub navigation_hint_selectors: Vec<String>,
    /// ARIA roles whose subtrees never hold the article.
    #[serde(default = "default_landmark_roles")]
    pub landmark_roles: Vec<String>,
    /// Minimum visible text for a selector candidate.
    #[serde(default = "default_min_candidate_text")]
    pub min_candidate_text: usize,
    /// Minimum visible text for the table fallback.
    #[serde(default = "default_min_table_text")]
    pub min_table_text: usize,
    /// Minimum visible text for the body fallback.
    #[serde(default = "default_min_candidate_text")]
    pub min_body_text: usize,
    /// Scoring weights.
    #[serde(default)]
    pub weights: ScoringWeights,
}

fn default_content_selectors() -> Vec<String> {
    [
        "article",
        "[role=\"main\"]",
        "main",
        ".post-content",
        ".article-body",
        ".entry-content",
        ".content",
        ".article-content",
        ".post",
        "#content",
        ".prose",
        // old blog engines that lay articles out in tables
        "td[width=\"435\"]",
        "body > table td",
        "body > div",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_noise_selectors() -> Vec<String> {
    [
        "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_navigation_hints() -> Vec<String> {
    [
        "[role=\"navigation\"]",
        "[role=\"banner\"]",
        "[role=\"contentinfo\"]",
        ".nav",
        ".navbar",
        ".navigation",
        ".menu",
        ".sidebar",
        ".breadcrumb",
        ".breadcrumbs",
        ".toc",
        ".table-of-contents",
        "#nav",
        "#menu",
        "#sidebar",
        "#breadcrumbs",
        "#toc",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_landmark_roles() -> Vec<String> {
    ["navigation", "banner", "contentinfo"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_min_candidate_text() -> usize {
    200
}

fn default_min_table_text() -> usize {
    300
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            content_selectors: default_content_selectors(),
            noise_selectors: default_noise_selectors(),
            navigation_hint_selectors: default_navigation_hints(),
            landmark_roles: default_landmark_roles(),
            min_candidate_text: default_min_candidate_text(),
            min_table_text: default_min_table_text(),
            min_body_text: default_min_candidate_text(),
            weights: ScoringWeights::default(),
        }
    }
}

impl ExtractionConfig {
    /// Creates a new extraction configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the candidate selector list.
    #[must_use]
    pub fn with_content_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a selector to remove.
    #[must_use]
    pub fn with_noise_selector(mut self, selector: impl Into<String>) -> Self {
        self.noise_selectors.push(selector.into());
        self
    }

    /// Overrides the scoring weights.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets every minimum text bar at once.
    #[must_use]
    pub fn with_min_text(mut self, chars: usize) -> Self {
        self.min_candidate_text = chars;
        self.min_table_text = chars;
        self.min_body_text = chars;
        self
    }
}

/// Configuration for the final clean-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessConfig {
    /// Drop the first `<h1>`; the caller shows the title separately.
    #[serde(default = "default_true")]
    pub strip_first_heading: bool,
    /// Drop `img`, `picture` and `source` elements.
    #[serde(default = "default_true")]
    pub strip_images: bool,
    /// Run the article sanitizer over extracted HTML.
    #[serde(default = "default_true")]
    pub sanitize: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            strip_first_heading: true,
            strip_images: true,
            sanitize: true,
        }
    }
}

/// Combined configuration for the article reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Retrieval strategies, in table order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<RetrievalStrategy>,
    /// Fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Post-processing configuration.
    #[serde(default)]
    pub postprocess: PostProcessConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// Creates a new reader configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ExtractError> {
        serde_json::from_str(json).map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Replaces the strategy table.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<RetrievalStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Replaces the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Replaces the extraction configuration.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Replaces the post-processing configuration.
    #[must_use]
    pub fn with_postprocess(mut self, postprocess: PostProcessConfig) -> Self {
        self.postprocess = postprocess;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.attempt_timeout(), Duration::from_millis(8000));
        assert_eq!(config.deadline(), Duration::from_millis(12000));
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::new()
            .with_attempt_timeout(Duration::from_secs(2))
            .with_deadline(Duration::from_secs(3))
            .with_user_agent("custom-agent")
            .with_header("Accept-Language", "en");

        assert_eq!(config.attempt_timeout_ms, 2000);
        assert_eq!(config.deadline_ms, 3000);
        assert_eq!(config.user_agent, "custom-agent");
        assert_eq!(config.headers.get("Accept-Language"), Some(&"en".to_string()));
    }

    #[test]
    fn test_scoring_weight_defaults() {
        let w = ScoringWeights::default();
        assert_eq!(w.paragraph, 80.0);
        assert_eq!(w.sentence, 30.0);
        assert_eq!(w.sentence_cap, 40);
        assert_eq!(w.heading, 40.0);
        assert_eq!(w.image, 25.0);
        assert_eq!(w.list_penalty, 25.0);
        assert_eq!(w.list_paragraph_ratio, 2);
    }

    #[test]
    fn test_extraction_config_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.content_selectors.first().map(String::as_str), Some("article"));
        assert!(config.noise_selectors.contains(&"script".to_string()));
        assert!(config.navigation_hint_selectors.contains(&".breadcrumb".to_string()));
        assert_eq!(config.min_candidate_text, 200);
        assert_eq!(config.min_table_text, 300);
    }

    #[test]
    fn test_extraction_config_builders() {
        let config = ExtractionConfig::default()
            .with_noise_selector(".newsletter")
            .with_min_text(50);
        assert_eq!(config.noise_selectors.last().map(String::as_str), Some(".newsletter"));
        assert_eq!(
            (config.min_candidate_text, config.min_table_text, config.min_body_text),
            (50, 50, 50)
        );

        let reader = ReaderConfig::default().with_extraction(config.clone());
        assert_eq!(reader.extraction, config);
    }

    #[test]
    fn test_reader_config_partial_json() {
        let config = ReaderConfig::from_json_str(
            r#"{"fetch": {"attempt_timeout_ms": 500}, "extraction": {"weights": {"paragraph": 10}}}"#,
        )
        .unwrap();

        assert_eq!(config.fetch.attempt_timeout_ms, 500);
        assert_eq!(config.fetch.deadline_ms, 12_000);
        assert_eq!(config.extraction.weights.paragraph, 10.0);
        assert_eq!(config.extraction.weights.heading, 40.0);
        assert_eq!(config.strategies.len(), default_strategies().len());
        assert!(config.postprocess.strip_images);
    }

    #[test]
    fn test_reader_config_bad_json() {
        let err = ReaderConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn test_reader_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"strategies": [{{"name": "direct", "template": "{{raw_url}}"}}], "postprocess": {{"strip_images": false}}}}"#
        )
        .unwrap();

        let config = ReaderConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.strategies.len(), 1);
        assert_eq!(config.strategies[0].name(), "direct");
        assert!(!config.postprocess.strip_images);
        assert!(config.postprocess.strip_first_heading);
    }
}
