//! arXiv query API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - A minimum delay between consecutive requests
//! - Transparent pagination as an entry stream

mod atom;

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

pub use atom::parse_feed;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::{ArxivEntry, Feed, Search};

/// arXiv API client.
#[derive(Clone)]
pub struct ArxivClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Full URL of the query endpoint.
    query_url: Url,

    /// Results requested per page.
    page_size: u32,

    /// Minimum spacing between requests.
    request_delay: Duration,

    /// Attempts allowed for a page that comes back empty.
    num_retries: u32,

    /// When the previous request was sent; shared between clones.
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl ArxivClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the API URL is invalid or HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(config.retry_min_backoff, config.retry_max_backoff)
            .build_with_max_retries(config.num_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let mut base = config.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let query_url = Url::parse(&base)?.join(api::QUERY_PATH)?;

        Ok(Self {
            client,
            query_url,
            page_size: config.page_size.max(1),
            request_delay: config.request_delay,
            num_retries: config.num_retries,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    /// URL requests are sent to.
    #[must_use]
    pub fn query_url(&self) -> &str {
        self.query_url.as_str()
    }

    /// Fetch a single page of results.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or an
    /// unparseable or error feed.
    pub async fn fetch_page(&self, search: &Search, start: u32, max_results: u32) -> ClientResult<Feed> {
        self.throttle().await;

        let params = search.page_params(start, max_results);
        tracing::debug!(query = %search, start, max_results, "Requesting arXiv page");

        let response = self.client.get(self.query_url.clone()).query(&params).send().await?;
        let response = handle_response(response).await?;
        let body = response.text().await?;

        parse_feed(&body)
    }

    /// Stream every entry matching `search`, following pagination.
    ///
    /// Stops at `search.max_results` or the total the API reports. The stream
    /// ends after the first error.
    pub fn results<'a>(
        &'a self,
        search: &'a Search,
    ) -> impl Stream<Item = ClientResult<ArxivEntry>> + 'a {
        try_stream! {
            let mut offset: u32 = 0;
            let mut total: Option<u32> = None;

            loop {
                let remaining = match (search.max_results, total) {
                    (Some(limit), Some(total)) => limit.min(total).saturating_sub(offset),
                    (Some(limit), None) => limit.saturating_sub(offset),
                    (None, Some(total)) => total.saturating_sub(offset),
                    (None, None) => self.page_size,
                };
                if remaining == 0 {
                    break;
                }

                let feed = self.fetch_page_with_retry(search, offset, remaining.min(self.page_size)).await?;
                total = Some(feed.total_results);

                if feed.entries.is_empty() {
                    break;
                }

                offset += feed.entries.len() as u32;
                for entry in feed.entries.into_iter().take(remaining as usize) {
                    yield entry;
                }
            }
        }
    }

    /// Fetch a page, retrying when it is empty although more results are expected.
    async fn fetch_page_with_retry(
        &self,
        search: &Search,
        offset: u32,
        max_results: u32,
    ) -> ClientResult<Feed> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let feed = self.fetch_page(search, offset, max_results).await?;

            if !feed.entries.is_empty() || feed.total_results <= offset {
                return Ok(feed);
            }
            if attempts > self.num_retries {
                return Err(ClientError::EmptyPage { offset, attempts });
            }

            tracing::warn!(
                query = %search,
                offset,
                attempt = attempts,
                total = feed.total_results,
                "Empty page before end of results, retrying"
            );
        }
    }

    /// Wait until `request_delay` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.request_delay).await;
        }
        *last = Some(Instant::now());
    }
}

/// Handle API response status codes.
async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            Err(ClientError::rate_limited(retry_after))
        }
        400 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::bad_request(text))
        }
        500..=599 => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::server(status.as_u16(), text))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
        }
    }
}

impl std::fmt::Debug for ArxivClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivClient")
            .field("query_url", &self.query_url.as_str())
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_delay(delay: Duration) -> ArxivClient {
        let mut config = Config::for_testing("http://127.0.0.1:9", ".");
        config.request_delay = delay;
        ArxivClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_throttle_spaces_requests() {
        let delay = Duration::from_millis(200);
        let client = client_with_delay(delay);

        let started = Instant::now();
        client.throttle().await;
        assert!(started.elapsed() < delay, "first request must not wait");

        client.throttle().await;
        assert!(started.elapsed() >= delay);

        let second = Instant::now();
        client.throttle().await;
        assert!(second.elapsed() >= delay - Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_throttle_shared_between_clones() {
        let delay = Duration::from_millis(150);
        let client = client_with_delay(delay);
        let clone = client.clone();

        let started = Instant::now();
        client.throttle().await;
        clone.throttle().await;
        assert!(started.elapsed() >= delay);
    }
}
