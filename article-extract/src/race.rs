//! The proxy race: one attempt per retrieval strategy, first extracted article wins.
//!
//! Three clocks can end an attempt early: its own timeout, the overall deadline and
//! the caller's cancellation token. The first two surface as
//! [`ExtractError::Timeout`]; the last as [`ExtractError::Cancelled`] so callers can
//! stay quiet about it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::cancellation::{CancellationToken, RaceGroup, RaceOutcome};
use crate::config::ReaderConfig;
use crate::errors::{AttemptFailure, ExtractError, TimeoutScope};
use crate::fetch::Fetcher;
use crate::observability::{AttemptObserver, SpanTimer};
use crate::pipeline::ContentPipeline;
use crate::strategy::RetrievalStrategy;

/// Fetches articles through every configured strategy at once.
#[derive(Clone)]
pub struct ArticleReader {
    strategies: Arc<[RetrievalStrategy]>,
    attempt_timeout: Duration,
    deadline: Duration,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn AttemptObserver>,
    pipeline: Arc<ContentPipeline>,
}

impl ArticleReader {
    /// Creates a reader. Fails if no strategy is configured or a selector is invalid.
    pub fn new(
        config: ReaderConfig,
        fetcher: Arc<dyn Fetcher>,
        observer: Arc<dyn AttemptObserver>,
    ) -> Result<Self, ExtractError> {
        if config.strategies.is_empty() {
            return Err(ExtractError::Config("no retrieval strategies configured".to_string()));
        }
        let pipeline = ContentPipeline::new(&config)?;

        Ok(Self {
            attempt_timeout: config.fetch.attempt_timeout(),
            deadline: config.fetch.deadline(),
            strategies: config.strategies.into(),
            fetcher,
            observer,
            pipeline: Arc::new(pipeline),
        })
    }

    /// A reader over HTTP with the stock strategies and logging observer.
    #[cfg(feature = "http")]
    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::from_config(ReaderConfig::default())
    }

    /// A reader over HTTP with `config` and the logging observer.
    #[cfg(feature = "http")]
    pub fn from_config(config: ReaderConfig) -> Result<Self, ExtractError> {
        let fetcher = crate::fetch::HttpFetcher::new(&config.fetch)?;
        Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(crate::observability::LoggingAttemptObserver),
        )
    }

    /// The strategy table, in order.
    #[must_use]
    pub fn strategies(&self) -> &[RetrievalStrategy] {
        &self.strategies
    }

    /// Extracts the article at `url`.
    ///
    /// `deadline` overrides the configured overall deadline. Cancelling `cancel`
    /// aborts every attempt and yields [`ExtractError::Cancelled`].
    pub async fn extract(
        &self,
        url: &str,
        deadline: Option<Duration>,
        cancel: Option<Arc<CancellationToken>>,
    ) -> Result<String, ExtractError> {
        let target = validate_url(url)?;
        let request_id: Arc<str> = Uuid::new_v4().to_string().into();
        let deadline = deadline.unwrap_or(self.deadline);
        let expiry = Instant::now() + deadline;
        let timer = SpanTimer::start("extract");

        if let Some(token) = cancel.as_deref().filter(|t| t.is_cancelled()) {
            return Err(cancelled_error(token));
        }

        info!(
            request_id = %request_id,
            url = %target,
            strategies = self.strategies.len(),
            deadline_ms = duration_ms(deadline),
            "Starting extraction race"
        );

        let mut group = RaceGroup::new(cancel.as_ref());
        for (index, strategy) in self.strategies.iter().enumerate() {
            let attempt = Attempt {
                request_id: request_id.clone(),
                target: target.clone(),
                strategy: strategy.clone(),
                timeout: self.attempt_timeout,
                fetcher: self.fetcher.clone(),
                observer: self.observer.clone(),
                pipeline: self.pipeline.clone(),
            };
            group.spawn(index, move |token| attempt.run(token));
        }

        let settled = tokio::select! {
            biased;
            () = wait_cancelled(cancel.as_deref()) => Settled::Cancelled,
            () = sleep_until(expiry) => Settled::DeadlineExceeded,
            outcome = group.first_success() => Settled::Raced(outcome),
        };

        let result = match settled {
            Settled::Raced(RaceOutcome::Winner { index, value }) => {
                let winner = self.strategies[index].name();
                info!(request_id = %request_id, winner, content_len = value.len(), "Extraction succeeded");
                self.observer.on_race_complete(&request_id, Some(winner), timer.elapsed_ms());
                return Ok(value);
            }
            Settled::Raced(RaceOutcome::AllFailed(failures)) => self.aggregate(failures),
            Settled::DeadlineExceeded => {
                group.cancel_all("deadline exceeded");
                warn!(request_id = %request_id, deadline_ms = duration_ms(deadline), "Extraction deadline exceeded");
                ExtractError::timeout(TimeoutScope::Deadline, duration_ms(deadline))
            }
            Settled::Cancelled => {
                let error = cancel
                    .as_deref()
                    .map_or_else(|| ExtractError::Cancelled("cancelled".to_string()), cancelled_error);
                group.cancel_all("cancelled by caller");
                debug!(request_id = %request_id, "Extraction cancelled");
                error
            }
        };

        self.observer.on_race_complete(&request_id, None, timer.elapsed_ms());
        Err(result)
    }

    /// Builds the aggregate error. The message comes from the lowest strategy
    /// index, not from whichever attempt finished last.
    fn aggregate(&self, failures: Vec<(usize, ExtractError)>) -> ExtractError {
        let failures: Vec<AttemptFailure> = failures
            .into_iter()
            .map(|(index, error)| AttemptFailure::new(self.strategies[index].name(), index, error))
            .collect();
        let message = failures
            .first()
            .map_or_else(|| "no strategy produced content".to_string(), |f| f.error.to_string());

        warn!(attempts = failures.len(), %message, "Every retrieval strategy failed");
        ExtractError::AllAttemptsFailed { message, failures }
    }
}

impl std::fmt::Debug for ArticleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleReader")
            .field("strategies", &self.strategies)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

enum Settled {
    Raced(RaceOutcome<String>),
    DeadlineExceeded,
    Cancelled,
}

/// One strategy's attempt, owned by its task.
struct Attempt {
    request_id: Arc<str>,
    target: String,
    strategy: RetrievalStrategy,
    timeout: Duration,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn AttemptObserver>,
    pipeline: Arc<ContentPipeline>,
}

impl Attempt {
    async fn run(self, token: Arc<CancellationToken>) -> Result<String, ExtractError> {
        let proxied = self.strategy.proxied_url(&self.target);
        let name = self.strategy.name();
        self.observer.on_attempt_start(&self.request_id, name, &proxied);
        let timer = SpanTimer::start(name);

        let result = tokio::select! {
            biased;
            () = token.cancelled() => Err(cancelled_error(&token)),
            outcome = tokio::time::timeout(self.timeout, self.fetch_and_extract(&proxied)) => {
                outcome.unwrap_or_else(|_| {
                    Err(ExtractError::timeout(TimeoutScope::Attempt, duration_ms(self.timeout)))
                })
            }
        };

        let duration_ms = timer.finish();
        match &result {
            Ok(html) => self.observer.on_attempt_success(&self.request_id, name, duration_ms, html.len()),
            Err(error) => self.observer.on_attempt_failure(&self.request_id, name, duration_ms, error),
        }
        result
    }

    async fn fetch_and_extract(&self, proxied: &str) -> Result<String, ExtractError> {
        let response = self.fetcher.fetch(proxied).await?.into_success()?;
        self.pipeline.process(&response.text, &self.target)
    }
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn cancelled_error(token: &CancellationToken) -> ExtractError {
    ExtractError::Cancelled(token.reason().unwrap_or_else(|| "cancelled".to_string()))
}

fn validate_url(url: &str) -> Result<String, ExtractError> {
    let invalid = |reason: String| ExtractError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.into()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
