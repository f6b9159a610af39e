//! HTTP backend for the filesystem bridge
//!
//! A read-only remote view of the dataset. The bridge's boundary is the URL
//! pathname of the base URL, so `https://mirror.example/files` is scoped to
//! `/files` and `https://mirror.example/files/v16.0.0` to `/files/v16.0.0`;
//! both enforce identical resolution semantics relative to their own prefix.
//!
//! Two collaboration points are injectable rather than baked in:
//!
//! - a [`RetryPolicy`], defaulting to [`NoRetry`] (backoff belongs to the
//!   caller, not the engine);
//! - a [`CancellationToken`] that aborts only the in-flight operation it is
//!   attached to. A cancelled read surfaces as [`MirrorError::Cancelled`],
//!   which the engines record as a per-file failure rather than a batch
//!   abort.
//!
//! `write`, `remove`, and `list_dir` report [`MirrorError::Unsupported`]; the
//! remote dataset is immutable and offers no listing endpoint (manifests come
//! from a [`ManifestSource`](crate::manifest::ManifestSource) instead).

use crate::bridge::{read_only, FileSystemBridge};
use crate::error::{MirrorError, Result};
use crate::path::{Boundary, ResolvedPath};
use crate::types::{FileEntry, FileKind, FileStat};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Retry policy for transient network failures
///
/// Applied only to transient errors; 404s and boundary violations are never
/// retried.
pub trait RetryPolicy: Send + Sync {
    /// Number of retries after the initial attempt
    fn max_retries(&self) -> usize;

    /// Delay before the given retry attempt (1-based)
    fn delay(&self, attempt: usize) -> Duration;
}

/// Default policy: fail on the first error
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn max_retries(&self) -> usize {
        0
    }

    fn delay(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }
}

/// Fixed-count retry with linear backoff
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    /// Retries after the initial attempt
    pub retries: usize,
    /// Base delay, multiplied by the attempt number
    pub base_delay: Duration,
}

impl RetryPolicy for LinearBackoff {
    fn max_retries(&self) -> usize {
        self.retries
    }

    fn delay(&self, attempt: usize) -> Duration {
        self.base_delay * attempt as u32
    }
}

/// Read-only filesystem bridge over an HTTP base URL
pub struct HttpBridge {
    client: Client,
    base: Url,
    boundary: Boundary,
    retry: Arc<dyn RetryPolicy>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for HttpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBridge")
            .field("base", &self.base.as_str())
            .field("boundary", &self.boundary)
            .finish()
    }
}

impl HttpBridge {
    /// Create a bridge for a base URL; its pathname becomes the boundary
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| MirrorError::invalid_argument(format!("invalid base URL: {}", e)))?;
        if !base.has_host() {
            return Err(MirrorError::invalid_argument(
                "base URL must have a host".to_string(),
            ));
        }
        let boundary = Boundary::new(base.path());
        debug!(base = %base, boundary = %boundary, "opened http bridge");
        Ok(HttpBridge {
            client: Client::new(),
            base,
            boundary,
            retry: Arc::new(NoRetry),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the HTTP client (timeouts, proxies, user agent)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Inject a retry policy for transient failures
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    /// Attach a cancellation token; triggering it aborts in-flight operations
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The URL a resolved virtual path maps to
    pub fn url_for(&self, resolved: &ResolvedPath) -> Url {
        let mut url = self.base.clone();
        url.set_path(resolved.as_str());
        url
    }

    async fn fetch(&self, resolved: &ResolvedPath, head: bool) -> Result<reqwest::Response> {
        let url = self.url_for(resolved);
        let attempts = self.retry.max_retries() + 1;

        for attempt in 1..=attempts {
            let request = if head {
                self.client.head(url.clone())
            } else {
                self.client.get(url.clone())
            };

            // Checking cancellation first means an already-cancelled token
            // never sends traffic.
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(MirrorError::Cancelled(resolved.as_str().to_string()));
                }
                outcome = request.send() => outcome,
            };

            match outcome {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    return Err(MirrorError::not_found(resolved.as_str().to_string()));
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => return Ok(response),
                    Err(e) if attempt < attempts => {
                        warn!(url = %url, attempt, "retrying after http status error: {}", e);
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) if attempt < attempts => {
                    warn!(url = %url, attempt, "retrying after network error: {}", e);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry.delay(attempt)).await;
        }

        // attempts >= 1, so the loop always returns
        Err(MirrorError::internal("retry loop exhausted without result"))
    }
}

#[async_trait]
impl FileSystemBridge for HttpBridge {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        let response = self.fetch(&resolved, false).await?;
        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(MirrorError::Cancelled(resolved.as_str().to_string()));
            }
            body = response.bytes() => body?,
        };
        trace!(path = %resolved, bytes = body.len(), "fetched remote file");
        Ok(body.to_vec())
    }

    async fn write(&self, path: &str, _content: &[u8]) -> Result<()> {
        self.resolve(path)?;
        Err(read_only("write", &self.boundary))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        match self.fetch(&resolved, true).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stat(&self, path: &str) -> Result<FileStat> {
        let resolved = self.resolve(path)?;
        let response = self.fetch(&resolved, true).await?;
        Ok(FileStat {
            kind: FileKind::File,
            size: response.content_length(),
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        self.resolve(path)?;
        Err(read_only("list_dir", &self.boundary))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.resolve(path)?;
        Err(read_only("remove", &self.boundary))
    }
}
