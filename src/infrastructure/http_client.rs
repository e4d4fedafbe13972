//! HTTP client for image reachability probing with rate limiting
//!
//! Sends header-only requests so no image body is ever downloaded.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::application::reachability::{ProbeError, ProbeResponse, UrlProbe};
use crate::infrastructure::config::ProbeConfig;

/// HEAD-request prober shared by every probe in a run
pub struct HttpProbeClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpProbeClient {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
        })
    }
}

/// Only absolute http(s) URLs are sent over the wire.
fn parse_probe_url(raw: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(raw).map_err(|e| ProbeError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProbeError::InvalidUrl(format!("{raw}: unsupported scheme '{other}'"))),
    }
}

fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout(timeout.as_millis() as u64)
    } else {
        ProbeError::Transport(error.without_url().to_string())
    }
}

#[async_trait]
impl UrlProbe for HttpProbeClient {
    async fn probe_url(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError> {
        let url = parse_probe_url(url)?;

        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        debug!(url = %url, status, content_type = ?content_type, "Probe responded");
        Ok(ProbeResponse { status, content_type })
    }
}
