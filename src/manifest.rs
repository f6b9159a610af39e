//! Manifests and the expected/present set diff
//!
//! A manifest is the list of files expected to exist for one dataset version.
//! Where it comes from (a remote directory listing, a precomputed document)
//! is an external collaborator's concern; the engines only consume its shape
//! through the [`ManifestSource`] trait.
//!
//! [`diff`] is the pure heart of both engines: given the expected set and the
//! files actually present, it splits them into missing, orphaned, and
//! matching. No I/O, no ordering guarantees beyond set membership.

use crate::error::{MirrorError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One manifest entry for a dataset version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedFile {
    /// Final path component
    pub name: String,
    /// Path relative to the version directory
    pub path: String,
    /// Path relative to the store root (`<version>/<path>`)
    pub store_path: String,
}

impl ExpectedFile {
    /// Build an entry from a version and a version-relative path
    pub fn new(version: &str, path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let store_path = format!("{}/{}", version, path);
        ExpectedFile {
            name,
            path,
            store_path,
        }
    }
}

/// Result of diffing expected files against present files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Expected but not present; the mirror target set
    pub missing: Vec<String>,
    /// Present but not expected; candidates for orphan cleanup
    pub orphaned: Vec<String>,
    /// Expected and present
    pub matching: Vec<String>,
}

/// Pure set-diff between expected and present file paths
///
/// Output order follows the input vectors but carries no guarantee beyond
/// set membership.
pub fn diff<S: AsRef<str>>(expected: &[S], present: &[S]) -> ManifestDiff {
    let expected_set: HashSet<&str> = expected.iter().map(|s| s.as_ref()).collect();
    let present_set: HashSet<&str> = present.iter().map(|s| s.as_ref()).collect();

    let mut result = ManifestDiff::default();
    for path in expected_set.iter() {
        if present_set.contains(path) {
            result.matching.push(path.to_string());
        } else {
            result.missing.push(path.to_string());
        }
    }
    for path in present_set.iter() {
        if !expected_set.contains(path) {
            result.orphaned.push(path.to_string());
        }
    }
    result
}

/// Supplier of per-version manifests
///
/// The store requires only the shape: a list of paths per version. A failure
/// here fails that version's whole operation before any per-file work starts.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Expected files for one version
    async fn manifest(&self, version: &str) -> Result<Vec<ExpectedFile>>;

    /// All versions this source knows about
    async fn versions(&self) -> Result<Vec<String>>;
}

/// In-memory manifest source for tests, seeding, and precomputed documents
#[derive(Debug, Default)]
pub struct StaticManifestSource {
    versions: RwLock<HashMap<String, Vec<ExpectedFile>>>,
}

impl StaticManifestSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version with its version-relative file paths
    pub fn insert<S: AsRef<str>>(&self, version: &str, paths: &[S]) {
        let files = paths
            .iter()
            .map(|p| ExpectedFile::new(version, p.as_ref()))
            .collect();
        self.versions.write().insert(version.to_string(), files);
    }
}

#[async_trait]
impl ManifestSource for StaticManifestSource {
    async fn manifest(&self, version: &str) -> Result<Vec<ExpectedFile>> {
        self.versions
            .read()
            .get(version)
            .cloned()
            .ok_or_else(|| MirrorError::Manifest {
                version: version.to_string(),
                reason: "unknown version".to_string(),
            })
    }

    async fn versions(&self) -> Result<Vec<String>> {
        let mut versions: Vec<String> = self.versions.read().keys().cloned().collect();
        versions.sort();
        Ok(versions)
    }
}
