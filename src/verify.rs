//! Snapshot verification
//!
//! Re-hashes every file recorded in a version's snapshot and compares the
//! digests, giving the store's hash-verifiable guarantee an observable
//! surface. Mismatches are reported per file as integrity errors; a missing
//! file is reported separately from a corrupted one.

use crate::bridge::FileSystemBridge;
use crate::error::{MirrorError, Result};
use crate::lockfile::{content_hash, LockfileStore};
use crate::types::FileFailure;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of verifying one version against its snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Version that was verified
    pub version: String,
    /// Files whose content matches the recorded hash
    pub verified: Vec<String>,
    /// Files whose content differs from the recorded hash
    pub mismatched: Vec<FileFailure>,
    /// Recorded files no longer present on disk
    pub missing: Vec<String>,
}

impl VerificationReport {
    /// Whether every recorded file is present and intact
    pub fn is_valid(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

/// Verifies mirrored content against recorded snapshots
pub struct SnapshotVerifier<'a> {
    local: Arc<dyn FileSystemBridge>,
    lockfile: &'a LockfileStore,
}

impl<'a> SnapshotVerifier<'a> {
    /// Wire a verifier to its collaborators
    pub fn new(local: Arc<dyn FileSystemBridge>, lockfile: &'a LockfileStore) -> Self {
        SnapshotVerifier { local, lockfile }
    }

    /// Verify one version; fails if the version has no snapshot
    pub async fn verify(&self, version: &str) -> Result<VerificationReport> {
        let snapshot = self
            .lockfile
            .snapshot(version)
            .await?
            .ok_or_else(|| MirrorError::not_found(format!("no snapshot for version {}", version)))?;

        let mut report = VerificationReport {
            version: version.to_string(),
            verified: Vec::new(),
            mismatched: Vec::new(),
            missing: Vec::new(),
        };

        for (relative, record) in &snapshot.files {
            let path = format!("{}/{}", version, relative);
            let content = match self.local.read(&path).await {
                Ok(content) => content,
                Err(e) if e.is_not_found() => {
                    report.missing.push(path);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let actual = content_hash(&content);
            if actual == record.hash {
                report.verified.push(path);
            } else {
                warn!(path, expected = %record.hash, actual = %actual, "hash mismatch");
                let err = MirrorError::Integrity {
                    path: path.clone(),
                    expected: record.hash.clone(),
                    actual,
                };
                report.mismatched.push(FileFailure::new(path, err));
            }
        }

        info!(
            version,
            verified = report.verified.len(),
            mismatched = report.mismatched.len(),
            missing = report.missing.len(),
            "verification finished"
        );
        Ok(report)
    }
}
