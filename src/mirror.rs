//! Mirror engine: concurrent fetch and write of one version
//!
//! For one dataset version the engine computes the target set with
//! [`diff`](crate::manifest::diff), schedules every fetch+write pair through
//! a single [`Limiter`], and finally records the version's snapshot and
//! lockfile entry as one logical unit.
//!
//! Failure semantics are all-settled: one file's network or write error is
//! captured into the result and never aborts sibling work. Only a failure to
//! obtain the manifest itself (before any per-file work starts) fails the
//! whole version.

use crate::bridge::{walk_files, FileSystemBridge};
use crate::error::Result;
use crate::limiter::{Concurrency, Limiter};
use crate::lockfile::{content_hash, LockfileStore, Snapshot};
use crate::manifest::{diff, ManifestSource};
use crate::types::{FileFailure, MirrorOptions, MirrorResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Orchestrates mirroring of one version at a time
pub struct MirrorEngine<'a> {
    local: Arc<dyn FileSystemBridge>,
    remote: Arc<dyn FileSystemBridge>,
    manifests: Arc<dyn ManifestSource>,
    lockfile: &'a LockfileStore,
    default_concurrency: Concurrency,
}

impl<'a> MirrorEngine<'a> {
    /// Wire an engine to its collaborators
    pub fn new(
        local: Arc<dyn FileSystemBridge>,
        remote: Arc<dyn FileSystemBridge>,
        manifests: Arc<dyn ManifestSource>,
        lockfile: &'a LockfileStore,
        default_concurrency: Concurrency,
    ) -> Self {
        MirrorEngine {
            local,
            remote,
            manifests,
            lockfile,
            default_concurrency,
        }
    }

    /// Mirror one version into the local store
    pub async fn mirror(&self, version: &str, options: &MirrorOptions) -> Result<MirrorResult> {
        let start = Instant::now();
        info!(version, dry_run = options.dry_run, force = options.force, "mirroring version");

        // Manifest failure fails the whole version before any per-file work.
        let expected = self.manifests.manifest(version).await?;
        let expected_paths: Vec<String> =
            expected.iter().map(|f| f.store_path.clone()).collect();

        let present = walk_files(self.local.as_ref(), version).await?;
        let d = diff(&expected_paths, &present);
        debug!(
            version,
            missing = d.missing.len(),
            matching = d.matching.len(),
            orphaned = d.orphaned.len(),
            "computed manifest diff"
        );

        let planned = if options.force {
            expected_paths.clone()
        } else {
            d.missing.clone()
        };
        let skipped = if options.force { Vec::new() } else { d.matching.clone() };

        let mut result = MirrorResult {
            version: version.to_string(),
            mirrored: Vec::new(),
            failed: Vec::new(),
            skipped,
            planned: planned.clone(),
            bytes_written: 0,
            dry_run: options.dry_run,
            duration_ms: 0,
        };

        if options.dry_run {
            result.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(result);
        }

        let limiter = Limiter::new(options.concurrency.unwrap_or(self.default_concurrency))?;
        let mut snapshot = self.base_snapshot(version, options.force, &result.skipped).await?;

        // All fetch+write pairs go through the one limiter; each task settles
        // independently.
        let mut tasks: JoinSet<(String, Result<(String, u64)>)> = JoinSet::new();
        for path in planned {
            let limiter = limiter.clone();
            let remote = Arc::clone(&self.remote);
            let local = Arc::clone(&self.local);
            tasks.spawn(async move {
                let outcome = limiter
                    .run(async {
                        let content = remote.read(&path).await?;
                        local.write(&path, &content).await?;
                        Ok((content_hash(&content), content.len() as u64))
                    })
                    .await;
                (path, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok((hash, size)))) => {
                    result.bytes_written += size;
                    if let Some(relative) = version_relative(version, &path) {
                        snapshot.record(relative, hash, size);
                    }
                    result.mirrored.push(path);
                }
                Ok((path, Err(e))) => {
                    warn!(path, error = %e, "file failed to mirror");
                    result.failed.push(FileFailure::new(path, e));
                }
                Err(e) => {
                    // A panicked task loses its path; record it against the
                    // version so the failure is still visible.
                    warn!(version, error = %e, "mirror task aborted");
                    result.failed.push(FileFailure::new(version, e));
                }
            }
        }

        // Snapshot and lockfile entry are updated as a single logical unit.
        // A run that tracked nothing (and never did) leaves no entry behind.
        if !snapshot.files.is_empty() || self.lockfile.entry(version).await.is_some() {
            self.lockfile.record_version(version, &snapshot).await?;
        }

        result.mirrored.sort();
        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            version,
            mirrored = result.mirrored.len(),
            failed = result.failed.len(),
            bytes = result.bytes_written,
            "mirror finished"
        );
        Ok(result)
    }

    /// Build the snapshot baseline a mirror run extends
    ///
    /// Prior records survive for files still expected and present; a `force`
    /// run rewrites everything. Matching files that predate tracking are
    /// backfilled by hashing their current content.
    async fn base_snapshot(
        &self,
        version: &str,
        force: bool,
        matching: &[String],
    ) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new(version);
        if force {
            return Ok(snapshot);
        }

        let prior = self.lockfile.snapshot(version).await?;
        for path in matching {
            let Some(relative) = version_relative(version, path) else {
                continue;
            };
            if let Some(record) = prior.as_ref().and_then(|s| s.files.get(relative)) {
                snapshot
                    .files
                    .insert(relative.to_string(), record.clone());
                continue;
            }
            match self.local.read(path).await {
                Ok(content) => {
                    snapshot.record(
                        relative,
                        content_hash(&content),
                        content.len() as u64,
                    );
                }
                Err(e) => {
                    // The file vanished between the walk and the read; the
                    // next mirror run will pick it up as missing.
                    warn!(path, error = %e, "could not backfill snapshot record");
                }
            }
        }
        Ok(snapshot)
    }
}

/// Strip the `<version>/` prefix from a store path
fn version_relative<'p>(version: &str, store_path: &'p str) -> Option<&'p str> {
    store_path
        .strip_prefix(version)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
}
