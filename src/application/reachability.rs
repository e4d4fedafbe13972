//! Reachability prober
//!
//! Probes the first `n` URLs of a list, strictly sequentially and in input
//! order. Each probe has its own deadline; a failure is recorded in its
//! result and never aborts the batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SAMPLE_SIZE: usize = 20;
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Extra time granted to an adapter before the batch-level deadline fires, so
/// the adapter's own timeout error is the one recorded.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Status line and headers of a header-only request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait UrlProbe: Send + Sync {
    async fn probe_url(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Responded {
        status: u16,
        content_type: Option<String>,
    },
    Failed { error: ProbeError },
}

/// Serialized as `{id, url, ok, status?, contentType?, error?}` with the
/// error rendered as its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ProbeRecord")]
pub struct ProbeResult {
    pub id: String,
    pub url: String,
    /// Response received with a status in `[200, 400)`.
    pub ok: bool,
    pub outcome: ProbeOutcome,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeRecord {
    id: String,
    url: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ProbeResult> for ProbeRecord {
    fn from(result: ProbeResult) -> Self {
        let (status, content_type, error) = match result.outcome {
            ProbeOutcome::Responded { status, content_type } => (Some(status), content_type, None),
            ProbeOutcome::Failed { error } => (None, None, Some(error.to_string())),
        };
        Self {
            id: result.id,
            url: result.url,
            ok: result.ok,
            status,
            content_type,
            error,
        }
    }
}

impl ProbeResult {
    pub fn new(id: impl Into<String>, url: impl Into<String>, outcome: ProbeOutcome) -> Self {
        let ok = matches!(outcome, ProbeOutcome::Responded { status, .. } if (200..400).contains(&status));
        Self {
            id: id.into(),
            url: url.into(),
            ok,
            outcome,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match &self.outcome {
            ProbeOutcome::Responded { status, .. } => Some(*status),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Responded { content_type, .. } => content_type.as_deref(),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.outcome {
            ProbeOutcome::Failed { error } => Some(error),
            ProbeOutcome::Responded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub reachable: usize,
    /// A response arrived but its status is outside `[200, 400)`.
    pub unreachable: usize,
    pub errored: usize,
}

impl ProbeSummary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match (&result.outcome, result.ok) {
                (_, true) => summary.reachable += 1,
                (ProbeOutcome::Responded { .. }, false) => summary.unreachable += 1,
                (ProbeOutcome::Failed { .. }, false) => summary.errored += 1,
            }
            summary
        })
    }
}

/// Probe the first `n` pairs in order, one at a time.
pub async fn probe_sample(
    probe: &dyn UrlProbe,
    pairs: &[(String, String)],
    n: usize,
    timeout: Duration,
) -> Vec<ProbeResult> {
    let sample = &pairs[..n.min(pairs.len())];
    info!(sample = sample.len(), timeout_ms = timeout.as_millis() as u64, "🔍 Probing image URLs");

    let mut results = Vec::with_capacity(sample.len());
    for (id, url) in sample {
        let outcome = match tokio::time::timeout(timeout + DEADLINE_GRACE, probe.probe_url(url, timeout)).await {
            Ok(Ok(response)) => ProbeOutcome::Responded {
                status: response.status,
                content_type: response.content_type,
            },
            Ok(Err(error)) => ProbeOutcome::Failed { error },
            Err(_) => ProbeOutcome::Failed {
                error: ProbeError::Timeout(timeout.as_millis() as u64),
            },
        };

        let result = ProbeResult::new(id.as_str(), url.as_str(), outcome);
        match result.error() {
            Some(error) => warn!(id = %id, url = %url, error = %error, "Probe failed"),
            None => debug!(id = %id, url = %url, status = ?result.status(), ok = result.ok, "Probe finished"),
        }
        results.push(result);
    }

    results
}
