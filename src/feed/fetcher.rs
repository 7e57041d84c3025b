use crate::config::Settings;
use crate::error::{Error, Result};
use crate::feed::parser::FeedParser;
use crate::feed::retry::RetryPolicy;
use crate::feed::NormalizedFeed;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// One way of turning a source URL into a normalized feed.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<NormalizedFeed>;
}

/// Feed-aware request: negotiates feed content types, enforces a deadline
/// and a success status, then parses the body bytes.
#[derive(Debug, Clone)]
pub struct DirectFetch {
    client: Client,
    timeout_duration: Duration,
    user_agent: String,
    parser: FeedParser,
}

/// Plain GET whose body is read as text and handed to the parser.
#[derive(Debug, Clone)]
pub struct RawHttpFetch {
    client: Client,
    parser: FeedParser,
}

/// Resolves a source URL through the primary strategy and, when that fails,
/// through the fallback according to the retry policy.
#[derive(Clone)]
pub struct FeedFetcher {
    primary: Arc<dyn FetchStrategy>,
    fallback: Arc<dyn FetchStrategy>,
    policy: RetryPolicy,
    parser: FeedParser,
}

fn build_client(timeout_duration: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout_duration)
        .redirect(reqwest::redirect::Policy::limited(10))
        .gzip(true)
        .build()
        .map_err(|e| Error::HttpError(format!("Failed to create HTTP client: {}", e)))
}

impl DirectFetch {
    pub fn new(client: Client, timeout_duration: Duration, user_agent: String) -> Self {
        Self {
            client,
            timeout_duration,
            user_agent,
            parser: FeedParser::new(),
        }
    }

    async fn fetch_response(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/rss+xml, application/atom+xml, application/xml, text/xml, */*")
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("Request failed: {}", e)))
    }
}

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> Result<NormalizedFeed> {
        let response = timeout(self.timeout_duration, self.fetch_response(url))
            .await
            .map_err(|_| Error::Timeout(format!("Request to {} timed out", url)))??;

        if !response.status().is_success() {
            return Err(Error::HttpError(format!(
                "HTTP {} for {}: {}",
                response.status().as_u16(),
                url,
                response.status().canonical_reason().unwrap_or("Unknown error")
            )));
        }

        let content = timeout(self.timeout_duration, response.bytes())
            .await
            .map_err(|_| Error::Timeout(format!("Reading body from {} timed out", url)))?
            .map_err(|e| Error::HttpError(format!("Failed to read response body: {}", e)))?;

        debug!("Downloaded {} bytes from {}", content.len(), url);

        self.parser.parse_feed(std::io::Cursor::new(content))
    }
}

impl RawHttpFetch {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            parser: FeedParser::new(),
        }
    }
}

#[async_trait]
impl FetchStrategy for RawHttpFetch {
    fn name(&self) -> &'static str {
        "raw"
    }

    async fn fetch(&self, url: &str) -> Result<NormalizedFeed> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("Request to {} timed out", url))
                } else {
                    Error::HttpError(format!("Request failed: {}", e))
                }
            })?
            .error_for_status()
            .map_err(|e| Error::HttpError(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::HttpError(format!("Failed to read response body: {}", e)))?;

        self.parser.parse_str(&body)
    }
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_duration = Duration::from_secs(settings.timeout);
        let client = build_client(timeout_duration)?;

        let primary = DirectFetch::new(client.clone(), timeout_duration, settings.user_agent.clone());
        let fallback = RawHttpFetch::new(client);

        Ok(Self::with_strategies(Arc::new(primary), Arc::new(fallback))
            .with_retry_policy(RetryPolicy::from(settings)))
    }

    pub fn with_strategies(primary: Arc<dyn FetchStrategy>, fallback: Arc<dyn FetchStrategy>) -> Self {
        Self {
            primary,
            fallback,
            policy: RetryPolicy::default(),
            parser: FeedParser::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn fetch(&self, url: &str) -> Result<NormalizedFeed> {
        debug!("Fetching feed from: {}", url);

        self.parser.validate_feed_url(url)?;

        let mut last_error = match self.primary.fetch(url).await {
            Ok(feed) => return Ok(feed),
            Err(e) => e,
        };

        for attempt in 2..=self.policy.max_attempts {
            let delay = self.policy.delay_before(attempt);
            warn!(
                "{} fetch of {} failed: {}. Retrying via {} in {:?}",
                if attempt == 2 { self.primary.name() } else { self.fallback.name() },
                url,
                last_error,
                self.fallback.name(),
                delay
            );

            tokio::time::sleep(delay).await;

            match self.fallback.fetch(url).await {
                Ok(feed) => {
                    info!("Fetched {} via {} on attempt {}", url, self.fallback.name(), attempt);
                    return Ok(feed);
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }
}
