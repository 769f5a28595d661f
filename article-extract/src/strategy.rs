//! Retrieval strategies: named ways of reaching a remote page through a proxy.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Placeholder replaced with the percent-encoded target URL.
pub const ENCODED_URL: &str = "{url}";
/// Placeholder replaced with the target URL verbatim.
pub const RAW_URL: &str = "{raw_url}";

/// A named proxy template.
///
/// The template is a URL containing `{url}` (query-encoded target) or `{raw_url}`
/// (target appended as-is, for path-style proxies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStrategy {
    name: String,
    template: String,
}

impl RetrievalStrategy {
    /// Creates a strategy from a name and a URL template.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Fetches the target directly, without a proxy.
    #[must_use]
    pub fn direct() -> Self {
        Self::new("direct", RAW_URL)
    }

    /// Strategy name, used in logs and failure records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Maps a target URL to the request URL for this proxy.
    #[must_use]
    pub fn proxied_url(&self, target: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        self.template
            .replace(ENCODED_URL, &encoded)
            .replace(RAW_URL, target)
    }
}

/// The stock strategy table.
#[must_use]
pub fn default_strategies() -> Vec<RetrievalStrategy> {
    vec![
        RetrievalStrategy::new("cors.lol", "https://api.cors.lol/?url={url}"),
        RetrievalStrategy::new("corsproxy.io", "https://corsproxy.io/?url={url}"),
        RetrievalStrategy::new("allorigins", "https://api.allorigins.win/raw?url={url}"),
        RetrievalStrategy::new("jina-reader", "https://r.jina.ai/{raw_url}"),
    ]
}
