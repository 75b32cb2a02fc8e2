//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients from the fetcher policy
//! - Page fetches under the policy's size, mime, rate and window limits
//! - robots.txt fetches
//! - Error classification into per-record fetch failures

use crate::config::{FetcherPolicy, RedirectMode};
use crate::storage::FetchedContent;
use crate::url::robots_url;
use crate::{CrawlError, ConfigError, FetchError, FetchResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client, Response};
use std::time::{Duration, Instant};

/// Mime type assumed when a response carries no Content-Type
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Fetches pages and robots.txt bodies
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page under the fetcher policy
    async fn fetch_page(&self, url: &str) -> FetchResult<FetchedContent>;

    /// Fetches `<domain>/robots.txt` and returns its body
    ///
    /// Non-success statuses are returned as [`FetchError::HttpStatus`].
    async fn fetch_robots(&self, domain: &str) -> FetchResult<String>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `policy` - The fetcher policy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - Invalid header value or client build failure
pub fn build_http_client(policy: &FetcherPolicy) -> Result<Client, CrawlError> {
    let mut headers = HeaderMap::new();
    let language = HeaderValue::from_str(&policy.accept_language).map_err(|e| {
        ConfigError::Validation(format!(
            "accept_language '{}' is not a valid header value: {}",
            policy.accept_language, e
        ))
    })?;
    headers.insert(ACCEPT_LANGUAGE, language);

    let redirect = match policy.redirect_mode {
        RedirectMode::FollowAll => Policy::limited(policy.max_redirects as usize),
        RedirectMode::FollowNone => Policy::none(),
    };

    let client = Client::builder()
        .user_agent(policy.user_agent())
        .default_headers(headers)
        .timeout(policy.request_timeout())
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// reqwest-backed fetcher shared by every shard of a run
pub struct HttpFetcher {
    client: Client,
    policy: FetcherPolicy,
    started: Instant,
}

impl HttpFetcher {
    /// Creates a fetcher; the crawl window starts now
    pub fn new(policy: FetcherPolicy) -> Result<Self, CrawlError> {
        let client = build_http_client(&policy)?;
        Ok(Self {
            client,
            policy,
            started: Instant::now(),
        })
    }

    pub fn policy(&self) -> &FetcherPolicy {
        &self.policy
    }

    fn window_closed(&self) -> bool {
        self.policy
            .crawl_window()
            .is_some_and(|window| self.started.elapsed() >= window)
    }

    async fn send(&self, url: &str) -> FetchResult<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(e, url))?;

        let status = response.status();
        if status.is_redirection() {
            return Err(match self.policy.redirect_mode {
                RedirectMode::FollowNone => FetchError::RedirectNotFollowed {
                    url: url.to_string(),
                },
                RedirectMode::FollowAll => FetchError::RedirectLimit {
                    url: url.to_string(),
                },
            });
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// Maps a reqwest error onto a fetch failure
fn classify_error(error: reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_redirect() {
        FetchError::RedirectLimit {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Returns the bare mime type of a Content-Type header value
fn mime_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

fn header_text(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> FetchResult<FetchedContent> {
        if ::url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        if self.window_closed() {
            return Err(FetchError::CrawlWindowClosed {
                url: url.to_string(),
            });
        }

        let delay = self.policy.crawl_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let start = Instant::now();
        let mut response = self.send(url).await?;

        let mime_type = mime_type_of(&response);
        if !self.policy.accepts_mime_type(&mime_type) {
            return Err(FetchError::InvalidMimeType {
                url: url.to_string(),
                mime_type,
            });
        }

        let limit = self.policy.max_content_size_for(&mime_type);
        let too_large = || FetchError::ContentTooLarge {
            url: url.to_string(),
            mime_type: mime_type.clone(),
            limit,
        };
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let fetched_url = response.url().to_string();
        let headers = header_text(response.headers());

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(e, url))? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > limit {
                return Err(too_large());
            }
        }

        let elapsed = start.elapsed().max(Duration::from_millis(1));
        let size_bytes = body.len() as u64;
        let response_rate = size_bytes as f64 / elapsed.as_secs_f64();
        let minimum = self.policy.min_response_rate;
        if minimum > 0 && response_rate < minimum as f64 {
            return Err(FetchError::SlowResponse {
                url: url.to_string(),
                rate: response_rate,
                minimum,
            });
        }

        tracing::debug!(
            "Fetched {} ({} bytes, {}, {:.0} B/s)",
            url,
            size_bytes,
            mime_type,
            response_rate
        );

        Ok(FetchedContent {
            url: url.to_string(),
            fetched_url,
            fetch_time: Utc::now(),
            content_text: String::from_utf8(body.clone()).ok(),
            content_binary: body,
            mime_type,
            size_bytes,
            response_rate,
            headers,
        })
    }

    async fn fetch_robots(&self, domain: &str) -> FetchResult<String> {
        let url = robots_url(domain);
        let response = self.send(&url).await?;
        response.text().await.map_err(|e| classify_error(e, &url))
    }
}
