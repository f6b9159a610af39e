//! Main mirror store implementation
//!
//! [`MirrorStore`] is the entry point tying the subsystems together: the
//! local bridge holding the replica, the remote bridge serving the dataset,
//! the manifest source describing each version, and the lockfile store that
//! makes the whole thing durable. It is an explicit handle with an open/flush
//! lifecycle, passed into every operation; there is no process-global state.
//!
//! [`MirrorStoreBuilder`] configures the non-default knobs: the concurrency
//! bound, orphan-removal policy, and custom bridge implementations.

use crate::bridge::FileSystemBridge;
use crate::clean::CleanEngine;
use crate::error::{MirrorError, Result};
use crate::http::HttpBridge;
use crate::limiter::Concurrency;
use crate::local::LocalBridge;
use crate::lockfile::{Lockfile, LockfileStore};
use crate::manifest::ManifestSource;
use crate::mirror::MirrorEngine;
use crate::types::{CleanOptions, CleanResult, MirrorConfig, MirrorOptions, MirrorResult};
use crate::verify::{SnapshotVerifier, VerificationReport};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Handle to one local mirror of the remote dataset
///
/// # Examples
///
/// ```rust,no_run
/// use ucd_mirror::{MirrorStore, MirrorOptions};
/// use ucd_mirror::manifest::StaticManifestSource;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> ucd_mirror::Result<()> {
/// let manifests = Arc::new(StaticManifestSource::new());
/// manifests.insert("16.0.0", &["ReadMe.txt", "ucd/UnicodeData.txt"]);
///
/// let store = MirrorStore::open(
///     "./mirror",
///     "https://www.unicode.org/Public",
///     manifests,
/// ).await?;
///
/// let result = store.mirror("16.0.0", &MirrorOptions::default()).await?;
/// println!("mirrored {} files", result.mirrored.len());
/// # Ok(())
/// # }
/// ```
pub struct MirrorStore {
    local: Arc<dyn FileSystemBridge>,
    remote: Arc<dyn FileSystemBridge>,
    manifests: Arc<dyn ManifestSource>,
    lockfile: LockfileStore,
    config: MirrorConfig,
}

impl std::fmt::Debug for MirrorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorStore")
            .field("root", &self.config.root_path)
            .field("remote", &self.config.remote_base)
            .finish()
    }
}

impl MirrorStore {
    /// Open a store over a local directory and a remote base URL
    pub async fn open(
        root: impl AsRef<Path>,
        remote_base: &str,
        manifests: Arc<dyn ManifestSource>,
    ) -> Result<Self> {
        MirrorStoreBuilder::new()
            .local_bridge(Arc::new(LocalBridge::new(root.as_ref())?))
            .remote_bridge(Arc::new(HttpBridge::new(remote_base)?))
            .build(manifests)
            .await
    }

    /// Mirror one version into the local store
    #[instrument(skip(self, options))]
    pub async fn mirror(&self, version: &str, options: &MirrorOptions) -> Result<MirrorResult> {
        self.mirror_engine().mirror(version, options).await
    }

    /// Mirror every version the manifest source knows about
    ///
    /// All-settled at version granularity: each version gets its own result
    /// and a failing version never affects its siblings.
    pub async fn mirror_all(
        &self,
        options: &MirrorOptions,
    ) -> Result<Vec<(String, Result<MirrorResult>)>> {
        let versions = self.manifests.versions().await?;
        let engine = self.mirror_engine();
        let mut results = Vec::with_capacity(versions.len());
        for version in versions {
            let outcome = engine.mirror(&version, options).await;
            results.push((version, outcome));
        }
        Ok(results)
    }

    /// Clean tracked versions from the local store
    #[instrument(skip(self, options))]
    pub async fn clean(&self, options: &CleanOptions) -> Vec<CleanResult> {
        CleanEngine::new(
            Arc::clone(&self.local),
            Arc::clone(&self.manifests),
            &self.lockfile,
            Concurrency::Bounded(self.config.concurrency),
            self.config.remove_orphans,
        )
        .clean(options)
        .await
    }

    /// Verify a mirrored version against its snapshot
    pub async fn verify(&self, version: &str) -> Result<VerificationReport> {
        SnapshotVerifier::new(Arc::clone(&self.local), &self.lockfile)
            .verify(version)
            .await
    }

    /// A read-only copy of the current lockfile state
    pub async fn status(&self) -> Lockfile {
        self.lockfile.current().await
    }

    /// Persist the lockfile state
    pub async fn flush(&self) -> Result<()> {
        self.lockfile.flush().await
    }

    /// The store's configuration
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// The bridge holding the local replica
    pub fn local_bridge(&self) -> &Arc<dyn FileSystemBridge> {
        &self.local
    }

    fn mirror_engine(&self) -> MirrorEngine<'_> {
        MirrorEngine::new(
            Arc::clone(&self.local),
            Arc::clone(&self.remote),
            Arc::clone(&self.manifests),
            &self.lockfile,
            Concurrency::Bounded(self.config.concurrency),
        )
    }
}

/// Builder for [`MirrorStore`] with custom configuration
#[derive(Default)]
pub struct MirrorStoreBuilder {
    local: Option<Arc<dyn FileSystemBridge>>,
    remote: Option<Arc<dyn FileSystemBridge>>,
    concurrency: Option<usize>,
    remove_orphans: Option<bool>,
}

impl MirrorStoreBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom local bridge (disk by default via [`MirrorStore::open`])
    pub fn local_bridge(mut self, bridge: Arc<dyn FileSystemBridge>) -> Self {
        self.local = Some(bridge);
        self
    }

    /// Use a custom remote bridge
    pub fn remote_bridge(mut self, bridge: Arc<dyn FileSystemBridge>) -> Self {
        self.remote = Some(bridge);
        self
    }

    /// Default concurrency bound for mirror and clean batches
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Whether clean removes files absent from the manifest (default: true)
    pub fn remove_orphans(mut self, remove_orphans: bool) -> Self {
        self.remove_orphans = Some(remove_orphans);
        self
    }

    /// Open the lockfile and assemble the store
    pub async fn build(self, manifests: Arc<dyn ManifestSource>) -> Result<MirrorStore> {
        let local = self
            .local
            .ok_or_else(|| MirrorError::invalid_argument("a local bridge is required"))?;
        let remote = self
            .remote
            .ok_or_else(|| MirrorError::invalid_argument("a remote bridge is required"))?;

        let concurrency = self.concurrency.unwrap_or(match Concurrency::DEFAULT {
            Concurrency::Bounded(n) => n,
            Concurrency::Unbounded => 8,
        });
        if concurrency == 0 {
            return Err(MirrorError::invalid_argument(
                "concurrency must be a positive integer",
            ));
        }

        let config = MirrorConfig {
            root_path: local.boundary().as_str().to_string(),
            remote_base: remote.boundary().as_str().to_string(),
            concurrency,
            remove_orphans: self.remove_orphans.unwrap_or(true),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let lockfile = LockfileStore::open(Arc::clone(&local)).await?;
        info!(root = %config.root_path, remote = %config.remote_base, "opened mirror store");

        Ok(MirrorStore {
            local,
            remote,
            manifests,
            lockfile,
            config,
        })
    }
}
