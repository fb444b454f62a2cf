//! Fetch and page-render capabilities, with a reqwest-backed default.
//!
//! The pipeline only sees the [`Fetcher`] and [`PageRenderer`] traits, so
//! tests can inject deterministic fakes. [`HttpFetcher`] implements both over
//! plain HTTP: redirects, timeouts, and a short retry on 5xx and 429.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{LogoError, LogoResult};

/// A rendered page: final status code plus markup.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub status: u16,
    pub html: String,
}

impl RenderedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves raw bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> LogoResult<Vec<u8>>;
}

/// Retrieves page markup for discovery.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> LogoResult<RenderedPage>;
}

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// HTTP client used for both page markup and image bytes.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpFetcher {
    /// Create a new client with a browser user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_retries: 2,
        }
    }

    /// Override how many times a 5xx/429/transport failure is retried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn get(&self, url: &str) -> LogoResult<reqwest::Response> {
        let mut retries = 0u32;

        loop {
            match self.client.get(url).send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tracing::debug!("GET {url} returned {status}, retry {retries} in {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status == 429 && retries < self.max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    return Ok(r);
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LogoResult<Vec<u8>> {
        let resp = self.get(url).await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(LogoError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PageRenderer for HttpFetcher {
    async fn render(&self, url: &str) -> LogoResult<RenderedPage> {
        let resp = self.get(url).await?;
        let status = resp.status().as_u16();
        let html = resp.text().await.unwrap_or_default();
        Ok(RenderedPage { status, html })
    }
}
