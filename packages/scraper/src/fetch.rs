//! Page fetching with retry for transient failures.
//!
//! Everything that downloads HTML goes through the [`PageFetcher`] trait so
//! that the orchestrator and the single-listing lookup can be driven by a
//! stub in tests. [`HttpFetcher`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;

use crate::ScrapeError;

/// Default number of retries for transient HTTP errors.
///
/// With exponential backoff (1s, 2s, 4s) the total wait before giving up
/// is 7 seconds on top of the per-request timeouts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("ub-realty/", env!("CARGO_PKG_VERSION"));

/// Downloads a page as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the request fails or the server answers
    /// with a non-success status.
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError>;
}

/// `reqwest`-backed [`PageFetcher`] with a request timeout and exponential
/// backoff on transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpFetcher {
    /// Builds a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying client cannot be
    /// constructed (e.g. TLS backend initialization failure).
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Overrides the number of retries for transient errors.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Overrides the first backoff delay; later delays double it.
    #[must_use]
    pub const fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Sends a GET request, retrying on connection errors, timeouts, HTTP
    /// 429 and HTTP 5xx. Other 4xx statuses are permanent.
    async fn send(&self, url: &str) -> Result<reqwest::Response, ScrapeError> {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1));
                log::warn!("  retry {attempt}/{} in {delay:?}...", self.max_retries);
                tokio::time::sleep(delay).await;
            }

            let error = match self.client.get(url).send().await {
                Err(e) if is_transient(&e) => ScrapeError::Http(e),
                Err(e) => return Err(ScrapeError::Http(e)),
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.is_redirection() {
                        return Ok(response);
                    }
                    let error = ScrapeError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
            };

            if attempt >= self.max_retries {
                log::error!("Giving up on {url} after {attempt} retries: {error}");
                return Err(error);
            }
            log::warn!("  transient error for {url}: {error}");
            attempt += 1;
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.send(url).await?;
        Ok(response.text().await?)
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::FORBIDDEN));
    }

    #[test]
    fn builds_with_overrides() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_max_retries(0)
            .with_backoff_base(Duration::from_millis(10));
        assert_eq!(fetcher.max_retries, 0);
        assert_eq!(fetcher.backoff_base, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn unreachable_host_fails_without_panicking() {
        let fetcher = HttpFetcher::new(Duration::from_millis(200))
            .unwrap()
            .with_max_retries(1)
            .with_backoff_base(Duration::from_millis(1));
        let result = fetcher.fetch_text("http://127.0.0.1:9/listing").await;
        assert!(matches!(result, Err(ScrapeError::Http(_))));
    }
}
