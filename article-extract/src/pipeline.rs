//! Turns one raw response body into the final article fragment.
//!
//! `repair → classify → {readability | markdown} → post-process`. Everything here is
//! synchronous; a proxy attempt calls [`ContentPipeline::process`] once its body has
//! arrived.

use tracing::debug;

use crate::classify::{classify, repair_broken_dashes, Payload};
use crate::config::ReaderConfig;
use crate::errors::ExtractError;
use crate::markdown::MarkdownRenderer;
use crate::postprocess::PostProcessor;
use crate::readability::ReadabilityExtractor;

/// The synchronous extraction chain shared by every attempt.
#[derive(Debug, Clone)]
pub struct ContentPipeline {
    extractor: ReadabilityExtractor,
    postprocessor: PostProcessor,
}

impl ContentPipeline {
    /// Builds the chain, compiling every configured selector.
    pub fn new(config: &ReaderConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            extractor: ReadabilityExtractor::new(config.extraction.clone())?,
            postprocessor: PostProcessor::new(config.postprocess)?,
        })
    }

    /// Extracts the article from `raw`, resolving links against `url`.
    ///
    /// An empty result is an error, never a success.
    pub fn process(&self, raw: &str, url: &str) -> Result<String, ExtractError> {
        let repaired = repair_broken_dashes(raw);
        let payload = classify(&repaired)?;
        debug!(url, payload = payload.label(), bytes = raw.len(), "Classified payload");

        let fragment = match payload {
            Payload::Html(html) => self.extractor.extract(&html, url)?,
            Payload::Markdown(markdown) => MarkdownRenderer::new(url).render(&markdown),
            Payload::PlainText(_) => {
                return Err(ExtractError::ClassificationEmpty(
                    "response had no markup or markdown structure".to_string(),
                ))
            }
            Payload::Empty => {
                return Err(ExtractError::ClassificationEmpty("response body was empty".to_string()))
            }
        };

        let html = self.postprocessor.process(&fragment);
        if html.is_empty() {
            return Err(ExtractError::ExtractionEmpty);
        }
        Ok(html)
    }
}
