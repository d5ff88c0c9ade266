use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_fetch_url;

/// Default bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of probes in flight during a batch.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Why a probe failed. Never leaves this module: every variant collapses to
/// "unreachable".
#[derive(Debug, Error)]
enum ProbeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

/// Outcome of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub reachable: bool,
}

/// Reachability prober for saved leads.
///
/// Issues a single HEAD request per URL with no retries. Any network error,
/// timeout or non-2xx status means "unreachable".
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: reqwest::Client,
    timeout: Duration,
    concurrency: usize,
}

impl LinkChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many probes may run at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns `true` if `url` answered a HEAD request with a success status.
    pub async fn probe(&self, url: &str) -> bool {
        match self.try_probe(url).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Link probe failed");
                false
            }
        }
    }

    /// Probes every URL with bounded parallelism.
    ///
    /// Completes only once every probe has settled. Results come back in
    /// completion order, one per input URL.
    pub async fn probe_all(&self, urls: Vec<String>) -> Vec<ProbeResult> {
        if urls.is_empty() {
            return Vec::new();
        }

        let total = urls.len();
        let results: Vec<ProbeResult> = stream::iter(urls)
            .map(|url| async move {
                let reachable = self.probe(&url).await;
                ProbeResult { url, reachable }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let unreachable = results.iter().filter(|r| !r.reachable).count();
        tracing::info!(
            total = total,
            unreachable = unreachable,
            "Link health pass complete"
        );

        results
    }

    /// Like [`probe_all`](Self::probe_all), keyed by URL.
    pub async fn probe_all_map(&self, urls: Vec<String>) -> HashMap<String, bool> {
        self.probe_all(urls)
            .await
            .into_iter()
            .map(|r| (r.url, r.reachable))
            .collect()
    }

    async fn try_probe(&self, url: &str) -> Result<(), ProbeError> {
        let target = validate_fetch_url(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.head(target).send())
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Network)?;

        if !response.status().is_success() {
            return Err(ProbeError::HttpStatus(response.status().as_u16()));
        }

        Ok(())
    }
}
