//! Clean engine: concurrent delete of tracked and orphaned files
//!
//! For each version the candidate set is the tracked file set (the snapshot
//! when one exists, else the manifest) plus any file physically present under
//! the version directory that is not tracked. Whether those orphans are
//! deleted is an explicit configuration flag on the store; the default is to
//! include them, since a clean that leaves unmanifested files behind never
//! converges.
//!
//! Versions settle independently: a version whose tracked set cannot be
//! determined yields a version-level failure in its own result while other
//! versions proceed. Within a version, each candidate settles independently
//! too.

use crate::bridge::{prune_empty_dirs, walk_files, FileSystemBridge};
use crate::error::Result;
use crate::limiter::{Concurrency, Limiter};
use crate::lockfile::LockfileStore;
use crate::manifest::{diff, ManifestSource};
use crate::types::{CleanOptions, CleanResult, FileFailure};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Recorded for a tracked file that is no longer on disk
const FILE_NOT_FOUND: &str = "File not found";

/// Orchestrates deletion of mirrored versions
pub struct CleanEngine<'a> {
    local: Arc<dyn FileSystemBridge>,
    manifests: Arc<dyn ManifestSource>,
    lockfile: &'a LockfileStore,
    default_concurrency: Concurrency,
    remove_orphans: bool,
}

impl<'a> CleanEngine<'a> {
    /// Wire an engine to its collaborators
    pub fn new(
        local: Arc<dyn FileSystemBridge>,
        manifests: Arc<dyn ManifestSource>,
        lockfile: &'a LockfileStore,
        default_concurrency: Concurrency,
        remove_orphans: bool,
    ) -> Self {
        CleanEngine {
            local,
            manifests,
            lockfile,
            default_concurrency,
            remove_orphans,
        }
    }

    /// Clean the requested versions (all tracked versions by default)
    ///
    /// All-settled at version granularity: one version's failure becomes a
    /// version-level entry in its own result and never affects the others.
    pub async fn clean(&self, options: &CleanOptions) -> Vec<CleanResult> {
        let versions = match &options.versions {
            Some(versions) => versions.clone(),
            None => self.lockfile.versions().await,
        };

        let mut results = Vec::with_capacity(versions.len());
        for version in &versions {
            let result = match self.clean_version(version, options.dry_run).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(version, error = %e, "version could not be cleaned");
                    CleanResult::version_failure(version, options.dry_run, e)
                }
            };
            results.push(result);
        }
        results
    }

    /// Clean one version's directory
    pub async fn clean_version(&self, version: &str, dry_run: bool) -> Result<CleanResult> {
        info!(version, dry_run, "cleaning version");

        let tracked = self.tracked_files(version).await?;
        let present = walk_files(self.local.as_ref(), version).await?;
        let d = diff(&tracked, &present);

        let mut result = CleanResult {
            version: version.to_string(),
            deleted: Vec::new(),
            failed: Vec::new(),
            orphans: if self.remove_orphans { d.orphaned.clone() } else { Vec::new() },
            bytes_freed: 0,
            dry_run,
        };

        let mut candidates = tracked;
        if self.remove_orphans {
            candidates.extend(d.orphaned);
        }
        debug!(version, candidates = candidates.len(), "computed clean candidates");

        let limiter = Limiter::new(self.default_concurrency)?;
        let mut tasks: JoinSet<(String, std::result::Result<Option<u64>, String>)> =
            JoinSet::new();
        for path in candidates {
            let limiter = limiter.clone();
            let local = Arc::clone(&self.local);
            tasks.spawn(async move {
                let outcome = limiter
                    .run(async {
                        match local.exists(&path).await {
                            Ok(true) => {}
                            Ok(false) => return Err(FILE_NOT_FOUND.to_string()),
                            Err(e) => return Err(e.to_string()),
                        }
                        // Size accounting is best-effort; a stat failure just
                        // omits the size.
                        let size = local.stat(&path).await.ok().and_then(|s| s.size);
                        if !dry_run {
                            if let Err(e) = local.remove(&path).await {
                                return Err(e.to_string());
                            }
                        }
                        Ok(size)
                    })
                    .await;
                (path, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok(size))) => {
                    result.bytes_freed += size.unwrap_or(0);
                    result.deleted.push(path);
                }
                Ok((path, Err(error))) => {
                    result.failed.push(FileFailure { path, error });
                }
                Err(e) => {
                    warn!(version, error = %e, "clean task aborted");
                    result.failed.push(FileFailure::new(version, e));
                }
            }
        }
        result.deleted.sort();

        if !dry_run {
            prune_empty_dirs(self.local.as_ref(), version).await?;
            self.settle_tracking(version, &result).await?;
        }

        info!(
            version,
            deleted = result.deleted.len(),
            failed = result.failed.len(),
            "clean finished"
        );
        Ok(result)
    }

    /// Tracked file set for a version, as store-relative paths
    ///
    /// The snapshot is authoritative once a mirror completed; the manifest
    /// covers versions whose mirror never finished.
    async fn tracked_files(&self, version: &str) -> Result<Vec<String>> {
        if let Some(snapshot) = self.lockfile.snapshot(version).await? {
            return Ok(snapshot
                .files
                .keys()
                .map(|relative| format!("{}/{}", version, relative))
                .collect());
        }
        let manifest = self.manifests.manifest(version).await?;
        Ok(manifest.into_iter().map(|f| f.store_path).collect())
    }

    /// Reconcile the lockfile with what the clean actually removed
    async fn settle_tracking(&self, version: &str, result: &CleanResult) -> Result<()> {
        let remaining = walk_files(self.local.as_ref(), version).await?;
        if remaining.is_empty() {
            return self.lockfile.remove_version(version).await;
        }

        // Partial clean: drop the deleted records but keep the version
        // tracked with accurate counts.
        let Some(mut snapshot) = self.lockfile.snapshot(version).await? else {
            return Ok(());
        };
        let deleted: HashSet<&str> = result.deleted.iter().map(|s| s.as_str()).collect();
        snapshot
            .files
            .retain(|relative, _| !deleted.contains(format!("{}/{}", version, relative).as_str()));
        if snapshot.files.is_empty() {
            self.lockfile.remove_version(version).await
        } else {
            self.lockfile.record_version(version, &snapshot).await
        }
    }
}
