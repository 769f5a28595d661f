//! Raw page retrieval.
//!
//! The race coordinator only sees the [`Fetcher`] trait. Dropping the returned future
//! aborts the request, which is how timeouts and cancellation reach the network.

use async_trait::async_trait;

use crate::errors::ExtractError;

/// Result of a fetch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text. Invalid UTF-8 is replaced with U+FFFD.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl FetchResult {
    /// A 200 response with `text`, for fakes and tests.
    #[must_use]
    pub fn ok(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            text: text.into(),
            final_url: url.into(),
            content_type: None,
            duration_ms: 0.0,
        }
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Converts a non-2xx response into a network error.
    pub fn into_success(self) -> Result<Self, ExtractError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExtractError::status(self.status_code))
        }
    }
}

/// Protocol for HTTP fetching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`. Non-2xx responses are returned, not raised.
    async fn fetch(&self, url: &str) -> Result<FetchResult, ExtractError>;
}

#[cfg(feature = "http")]
pub use client::HttpFetcher;

#[cfg(feature = "http")]
mod client {
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
    use std::time::Instant;
    use tracing::debug;

    use super::{FetchResult, Fetcher};
    use crate::config::FetchConfig;
    use crate::errors::ExtractError;

    /// [`Fetcher`] over a shared `reqwest` client.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
        max_response_bytes: usize,
    }

    impl HttpFetcher {
        /// Builds a client with the configured user agent and headers.
        pub fn new(config: &FetchConfig) -> Result<Self, ExtractError> {
            let mut headers = HeaderMap::new();
            for (key, value) in &config.headers {
                let name = HeaderName::from_bytes(key.as_bytes())
                    .map_err(|e| ExtractError::Config(format!("header {key}: {e}")))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| ExtractError::Config(format!("header {key}: {e}")))?;
                headers.insert(name, value);
            }

            // Timeouts belong to the race, not the client.
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .default_headers(headers)
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .map_err(|e| ExtractError::Config(format!("http client: {e}")))?;

            Ok(Self {
                client,
                max_response_bytes: config.max_response_bytes,
            })
        }
    }

    #[async_trait]
    impl Fetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResult, ExtractError> {
            let start = Instant::now();
            let mut response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ExtractError::network(e.to_string()))?;

            let status_code = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            if !response.status().is_success() {
                return Ok(FetchResult {
                    status_code,
                    text: String::new(),
                    final_url,
                    content_type,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                });
            }

            if response
                .content_length()
                .is_some_and(|len| len > self.max_response_bytes as u64)
            {
                return Err(ExtractError::network(format!(
                    "response exceeds {} bytes",
                    self.max_response_bytes
                )));
            }

            let mut body = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ExtractError::network(e.to_string()))?
            {
                if body.len() + chunk.len() > self.max_response_bytes {
                    return Err(ExtractError::network(format!(
                        "response exceeds {} bytes",
                        self.max_response_bytes
                    )));
                }
                body.extend_from_slice(&chunk);
            }

            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            debug!(url, status_code, bytes = body.len(), duration_ms, "Fetched");

            Ok(FetchResult {
                status_code,
                text: String::from_utf8_lossy(&body).into_owned(),
                final_url,
                content_type,
                duration_ms,
            })
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_result_is_success() {
        let success = FetchResult::ok("https://a.com", "");
        assert!(success.is_success());

        let not_found = FetchResult {
            status_code: 404,
            ..success.clone()
        };
        assert!(!not_found.is_success());

        let redirect = FetchResult {
            status_code: 301,
            ..success
        };
        assert!(!redirect.is_success());
    }

    #[tokio::test]
    async fn test_mock_fetcher_as_trait_object() {
        let mut mock = MockFetcher::new();
        mock.expect_fetch()
            .withf(|url| url == "https://p.example/?url=x")
            .times(1)
            .returning(|url| Ok(FetchResult::ok(url, "<p>x</p>")));

        let fetcher: Box<dyn Fetcher> = Box::new(mock);
        let result = fetcher.fetch("https://p.example/?url=x").await.unwrap();
        assert_eq!(result.text, "<p>x</p>");
    }
}
