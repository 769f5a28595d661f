//! Final clean-up of the rendered article fragment.

use scraper::Selector;

use crate::config::PostProcessConfig;
use crate::dom::{compile_selector, Document, NodeFilter, PassThrough};
use crate::errors::ExtractError;
use crate::sanitize::HtmlSanitizer;

/// Removes the leading title and media, then sanitizes.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    config: PostProcessConfig,
    heading: Selector,
    media: Selector,
    sanitizer: HtmlSanitizer,
}

impl PostProcessor {
    /// Creates a post-processor.
    pub fn new(config: PostProcessConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            config,
            heading: compile_selector("h1")?,
            media: compile_selector("img, picture, source")?,
            sanitizer: HtmlSanitizer::article(),
        })
    }

    /// Applies the configured passes to `html`.
    #[must_use]
    pub fn process(&self, html: &str) -> String {
        let mut doc = Document::parse_fragment(html);

        // The title is rendered by the caller; only the first h1 goes.
        if self.config.strip_first_heading {
            doc.remove_first(&self.heading);
        }
        if self.config.strip_images {
            doc.remove_matching(&self.media);
        }

        let filter: &dyn NodeFilter = if self.config.sanitize {
            &self.sanitizer
        } else {
            &PassThrough
        };
        doc.fragment_html(filter).trim().to_string()
    }
}
