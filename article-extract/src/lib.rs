//! # Article Extract
//!
//! Fetches the web page behind a feed entry and turns it into a clean article fragment.
//!
//! The crate provides:
//!
//! - **Proxy racing**: every retrieval strategy is tried at once under per-attempt
//!   timeouts and an overall deadline; the first extracted article wins
//! - **Payload classification**: JSON proxy envelopes, HTML and reader-proxy Markdown
//! - **Readability scoring**: a tunable heuristic that picks the main content region
//! - **Sanitized output**: allowlist sanitization, absolute links, no tracking images
//! - **Cancellation handling**: caller cancellation that is distinguishable from failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use article_extract::prelude::*;
//!
//! let reader = ArticleReader::with_defaults()?;
//! match reader.extract("https://example.com/post", None, None).await {
//!     Ok(html) => render(&html),
//!     Err(e) if e.is_cancelled() => {}
//!     Err(e) => show_error(&e.user_message()),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod cancellation;
pub mod classify;
pub mod config;
pub mod dom;
pub mod errors;
pub mod fetch;
pub mod links;
pub mod markdown;
pub mod observability;
pub mod pipeline;
pub mod postprocess;
pub mod race;
pub mod readability;
pub mod sanitize;
pub mod strategy;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, RaceGroup, RaceOutcome};
    pub use crate::classify::{classify, Payload};
    pub use crate::config::{
        ExtractionConfig, FetchConfig, PostProcessConfig, ReaderConfig, ScoringWeights,
    };
    pub use crate::errors::{AttemptFailure, ErrorKind, ExtractError, TimeoutScope};
    #[cfg(feature = "http")]
    pub use crate::fetch::HttpFetcher;
    pub use crate::fetch::{FetchResult, Fetcher};
    pub use crate::markdown::MarkdownRenderer;
    pub use crate::observability::{
        init_tracing, AttemptObserver, CollectingAttemptObserver, LoggingAttemptObserver,
        NoOpAttemptObserver,
    };
    pub use crate::pipeline::ContentPipeline;
    pub use crate::postprocess::PostProcessor;
    pub use crate::race::ArticleReader;
    pub use crate::readability::ReadabilityExtractor;
    pub use crate::sanitize::HtmlSanitizer;
    pub use crate::strategy::{default_strategies, RetrievalStrategy};
}
