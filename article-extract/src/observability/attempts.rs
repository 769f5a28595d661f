//! Per-attempt observability for the proxy race.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;

use crate::errors::{ErrorKind, ExtractError};

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Callbacks for the lifecycle of each retrieval attempt.
///
/// Observation is advisory; implementations must not block.
pub trait AttemptObserver: Send + Sync {
    /// Called when an attempt is launched.
    fn on_attempt_start(&self, request_id: &str, strategy: &str, proxied_url: &str);

    /// Called when an attempt produced content.
    fn on_attempt_success(&self, request_id: &str, strategy: &str, duration_ms: f64, content_len: usize);

    /// Called when an attempt failed, timed out or was cancelled.
    fn on_attempt_failure(&self, request_id: &str, strategy: &str, duration_ms: f64, error: &ExtractError);

    /// Called once per request when the race settles.
    fn on_race_complete(&self, request_id: &str, winner: Option<&str>, duration_ms: f64);
}

/// No-op implementation of AttemptObserver.
#[derive(Debug, Clone, Default)]
pub struct NoOpAttemptObserver;

impl AttemptObserver for NoOpAttemptObserver {
    fn on_attempt_start(&self, _request_id: &str, _strategy: &str, _proxied_url: &str) {}
    fn on_attempt_success(&self, _request_id: &str, _strategy: &str, _duration_ms: f64, _content_len: usize) {}
    fn on_attempt_failure(&self, _request_id: &str, _strategy: &str, _duration_ms: f64, _error: &ExtractError) {}
    fn on_race_complete(&self, _request_id: &str, _winner: Option<&str>, _duration_ms: f64) {}
}

/// Logging-based attempt observer.
#[derive(Debug, Clone, Default)]
pub struct LoggingAttemptObserver;

impl AttemptObserver for LoggingAttemptObserver {
    fn on_attempt_start(&self, request_id: &str, strategy: &str, proxied_url: &str) {
        tracing::debug!(request_id, strategy, proxied_url, "Attempt started");
    }

    fn on_attempt_success(&self, request_id: &str, strategy: &str, duration_ms: f64, content_len: usize) {
        tracing::info!(request_id, strategy, duration_ms, content_len, "Attempt succeeded");
    }

    fn on_attempt_failure(&self, request_id: &str, strategy: &str, duration_ms: f64, error: &ExtractError) {
        if error.is_cancelled() {
            tracing::debug!(request_id, strategy, duration_ms, %error, "Attempt cancelled");
        } else {
            tracing::warn!(
                request_id,
                strategy,
                duration_ms,
                kind = ?error.kind(),
                %error,
                "Attempt failed"
            );
        }
    }

    fn on_race_complete(&self, request_id: &str, winner: Option<&str>, duration_ms: f64) {
        tracing::info!(request_id, winner, duration_ms, "Race settled");
    }
}

/// One recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttemptEvent {
    /// An attempt was launched.
    Started {
        /// Strategy name.
        strategy: String,
        /// The URL actually requested.
        proxied_url: String,
    },
    /// An attempt produced content.
    Succeeded {
        /// Strategy name.
        strategy: String,
        /// Bytes of extracted HTML.
        content_len: usize,
    },
    /// An attempt failed.
    Failed {
        /// Strategy name.
        strategy: String,
        /// Error kind.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
    /// The race settled.
    Completed {
        /// Winning strategy, if any.
        winner: Option<String>,
    },
}

/// Records every observation in memory.
#[derive(Debug, Default)]
pub struct CollectingAttemptObserver {
    events: Mutex<Vec<AttemptEvent>>,
}

impl CollectingAttemptObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events.lock().clone()
    }

    /// Names of strategies whose attempt started, in launch order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                AttemptEvent::Started { strategy, .. } => Some(strategy.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of strategies that reported an outcome.
    #[must_use]
    pub fn settled(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                AttemptEvent::Succeeded { strategy, .. } | AttemptEvent::Failed { strategy, .. } => {
                    Some(strategy.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl AttemptObserver for CollectingAttemptObserver {
    fn on_attempt_start(&self, _request_id: &str, strategy: &str, proxied_url: &str) {
        self.events.lock().push(AttemptEvent::Started {
            strategy: strategy.to_string(),
            proxied_url: proxied_url.to_string(),
        });
    }

    fn on_attempt_success(&self, _request_id: &str, strategy: &str, _duration_ms: f64, content_len: usize) {
        self.events.lock().push(AttemptEvent::Succeeded {
            strategy: strategy.to_string(),
            content_len,
        });
    }

    fn on_attempt_failure(&self, _request_id: &str, strategy: &str, _duration_ms: f64, error: &ExtractError) {
        self.events.lock().push(AttemptEvent::Failed {
            strategy: strategy.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    fn on_race_complete(&self, _request_id: &str, winner: Option<&str>, _duration_ms: f64) {
        self.events.lock().push(AttemptEvent::Completed {
            winner: winner.map(String::from),
        });
    }
}
