//! Error types for article acquisition and extraction.
//!
//! Every failure an attempt can produce maps onto one [`ExtractError`] variant.
//! Attempt-level failures are recovered by the race coordinator and only surface,
//! aggregated, once every retrieval strategy has failed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Suffix appended to aggregate failures shown to the reader.
pub const OPEN_ORIGINAL_HINT: &str = "try again later or open the original link in a new window";

/// Which clock expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutScope {
    /// A single strategy's attempt timeout.
    Attempt,
    /// The overall deadline for the whole request.
    Deadline,
}

impl fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempt => f.write_str("attempt"),
            Self::Deadline => f.write_str("deadline"),
        }
    }
}

/// Stable tag for each error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure or non-2xx status.
    Network,
    /// Attempt timeout or overall deadline.
    Timeout,
    /// External cancellation.
    Cancelled,
    /// Proxy-reported JSON error.
    Envelope,
    /// Nothing interpretable in the payload.
    ClassificationEmpty,
    /// No candidate cleared the minimum bar.
    ExtractionEmpty,
    /// The target URL could not be parsed.
    InvalidUrl,
    /// A configured CSS selector failed to parse.
    InvalidSelector,
    /// Configuration could not be loaded.
    Config,
    /// Every strategy failed.
    AllAttemptsFailed,
}

/// The main error type.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Transport failure or non-2xx response.
    #[error("request failed: {message}")]
    Network {
        /// What went wrong.
        message: String,
        /// HTTP status, when a response arrived.
        status: Option<u16>,
    },

    /// A timeout expired.
    #[error("timed out after {elapsed_ms}ms ({scope})")]
    Timeout {
        /// Which clock expired.
        scope: TimeoutScope,
        /// The configured limit in milliseconds.
        elapsed_ms: u64,
    },

    /// Cancelled by the caller. Never shown to the reader as a content error.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The proxy wrapped an error in its JSON envelope.
    #[error("{0}")]
    Envelope(String),

    /// The payload held nothing we know how to interpret.
    #[error("no readable content in response: {0}")]
    ClassificationEmpty(String),

    /// The document had no region worth keeping.
    #[error("no article content found")]
    ExtractionEmpty,

    /// The target URL is not a valid absolute URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A configured selector failed to parse.
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Every strategy failed; `message` comes from the first strategy in table order.
    #[error("{message}")]
    AllAttemptsFailed {
        /// Message of the first recorded failure.
        message: String,
        /// Every attempt's failure, in strategy order.
        failures: Vec<AttemptFailure>,
    },
}

impl ExtractError {
    /// Creates a network error without a status.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a network error for a non-2xx status.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Network {
            message: format!("status {status}"),
            status: Some(status),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(scope: TimeoutScope, elapsed_ms: u64) -> Self {
        Self::Timeout { scope, elapsed_ms }
    }

    /// Returns the stable kind tag.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Envelope(_) => ErrorKind::Envelope,
            Self::ClassificationEmpty(_) => ErrorKind::ClassificationEmpty,
            Self::ExtractionEmpty => ErrorKind::ExtractionEmpty,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::InvalidSelector(_) => ErrorKind::InvalidSelector,
            Self::Config(_) => ErrorKind::Config,
            Self::AllAttemptsFailed { .. } => ErrorKind::AllAttemptsFailed,
        }
    }

    /// Whether this is a deliberate cancellation the caller should not display.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Whether any timeout (attempt or deadline) expired.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Display-safe message for the reader.
    ///
    /// Aggregate failures carry a hint to open the source link instead.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AllAttemptsFailed { message, .. } => {
                format!("{message}; {OPEN_ORIGINAL_HINT}")
            }
            Self::Timeout {
                scope: TimeoutScope::Deadline,
                ..
            } => format!("loading the article took too long; {OPEN_ORIGINAL_HINT}"),
            other => other.to_string(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Network {
                status: Some(status),
                ..
            } => {
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::Timeout { scope, elapsed_ms } => {
                map.insert("scope".to_string(), serde_json::json!(scope));
                map.insert("elapsed_ms".to_string(), serde_json::json!(elapsed_ms));
            }
            Self::AllAttemptsFailed { failures, .. } => {
                map.insert(
                    "failures".to_string(),
                    serde_json::json!(failures.iter().map(AttemptFailure::to_dict).collect::<Vec<_>>()),
                );
            }
            _ => {}
        }

        map
    }
}

/// One strategy's failure, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// Strategy name.
    pub strategy: String,
    /// Position in the strategy table.
    pub index: usize,
    /// The failure.
    pub error: ExtractError,
}

impl AttemptFailure {
    /// Creates a new attempt failure record.
    #[must_use]
    pub fn new(strategy: impl Into<String>, index: usize, error: ExtractError) -> Self {
        Self {
            strategy: strategy.into(),
            index,
            error,
        }
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "strategy": self.strategy,
            "index": self.index,
            "kind": self.error.kind(),
            "message": self.error.to_string(),
        })
    }
}
