//! Durable index of mirrored versions and per-file content hashes
//!
//! Two JSON documents make the store's state hash-verifiable and convergent
//! across repeated mirror/clean cycles:
//!
//! - the **lockfile** (`ucd-mirror.lock` at the store root): one entry per
//!   mirrored version with its path, file count, and total size;
//! - one **snapshot** per version (`.snapshots/<version>.json`): a map from
//!   version-relative path to `sha256:` hash and size.
//!
//! Both are written through the store's own bridge, so the boundary check
//! covers them too. A [`LockfileStore`] exclusively owns its lockfile; no
//! other component reads or writes it directly, and its read-modify-write per
//! version is serialized under a single writer lock even while per-file
//! mirror/clean work proceeds in parallel.

use crate::bridge::FileSystemBridge;
use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Schema identifier of the lockfile document
pub const LOCKFILE_SCHEMA: &str = "unicode-mirror-index@1";
/// Schema identifier of snapshot documents
pub const SNAPSHOT_SCHEMA: &str = "unicode-snapshot@1";
/// Lockfile location, relative to the store root
pub const LOCKFILE_NAME: &str = "ucd-mirror.lock";
/// Snapshot directory, relative to the store root
pub const SNAPSHOT_DIR: &str = ".snapshots";

/// Hash arbitrary content into the snapshot hash format
///
/// ```rust
/// let hash = ucd_mirror::lockfile::content_hash(b"0000;NULL");
/// assert!(hash.starts_with("sha256:"));
/// assert!(ucd_mirror::lockfile::is_content_hash(&hash));
/// ```
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Whether a string is a well-formed `sha256:` content hash
pub fn is_content_hash(hash: &str) -> bool {
    match hash.strip_prefix("sha256:") {
        Some(digest) => {
            digest.len() == 64
                && digest
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}

/// One mirrored version's entry in the lockfile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    /// Store-relative path of the version directory
    pub path: String,
    /// Number of tracked files
    pub file_count: u64,
    /// Total tracked bytes
    pub total_size: u64,
}

/// The persisted lockfile document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    /// Format version; always 1
    pub lockfile_version: u32,
    /// Schema identifier; always [`LOCKFILE_SCHEMA`]
    pub schema: String,
    /// Mirrored versions, keyed by version string
    pub versions: BTreeMap<String, VersionEntry>,
}

impl Lockfile {
    fn new() -> Self {
        Lockfile {
            lockfile_version: 1,
            schema: LOCKFILE_SCHEMA.to_string(),
            versions: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lockfile_version != 1 {
            return Err(MirrorError::InvalidLockfile(format!(
                "unsupported lockfileVersion {}",
                self.lockfile_version
            )));
        }
        if self.schema != LOCKFILE_SCHEMA {
            return Err(MirrorError::InvalidLockfile(format!(
                "unexpected schema '{}'",
                self.schema
            )));
        }
        Ok(())
    }
}

/// One file's record in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// `sha256:` content hash
    pub hash: String,
    /// Size in bytes
    pub size: u64,
}

/// Per-version content-addressable record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Schema identifier; always [`SNAPSHOT_SCHEMA`]
    pub schema: String,
    /// Dataset version this snapshot belongs to
    pub unicode_version: String,
    /// Tracked files, keyed by version-relative path
    pub files: BTreeMap<String, SnapshotFile>,
}

impl Snapshot {
    /// Create an empty snapshot for a version
    pub fn new(version: &str) -> Self {
        Snapshot {
            schema: SNAPSHOT_SCHEMA.to_string(),
            unicode_version: version.to_string(),
            files: BTreeMap::new(),
        }
    }

    /// Record a file's hash and size
    pub fn record(&mut self, path: impl Into<String>, hash: String, size: u64) {
        self.files.insert(path.into(), SnapshotFile { hash, size });
    }

    /// Total size of all tracked files
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.schema != SNAPSHOT_SCHEMA {
            return Err(MirrorError::InvalidSnapshot(format!(
                "unexpected schema '{}'",
                self.schema
            )));
        }
        for (path, file) in &self.files {
            if !is_content_hash(&file.hash) {
                return Err(MirrorError::InvalidSnapshot(format!(
                    "malformed hash for '{}': {}",
                    path, file.hash
                )));
            }
        }
        Ok(())
    }
}

fn snapshot_path(version: &str) -> String {
    format!("{}/{}.json", SNAPSHOT_DIR, version)
}

/// Handle owning the lockfile and snapshots of one store
///
/// Explicit open/flush lifecycle; the handle is passed into every operation
/// rather than living in process-global state.
#[derive(Debug)]
pub struct LockfileStore {
    bridge: Arc<dyn FileSystemBridge>,
    state: Mutex<Lockfile>,
}

impl LockfileStore {
    /// Open the lockfile through a bridge, creating it if absent
    pub async fn open(bridge: Arc<dyn FileSystemBridge>) -> Result<Self> {
        let state = match bridge.read(LOCKFILE_NAME).await {
            Ok(bytes) => {
                let lockfile: Lockfile = serde_json::from_slice(&bytes)?;
                lockfile.validate()?;
                debug!(versions = lockfile.versions.len(), "opened existing lockfile");
                lockfile
            }
            Err(e) if e.is_not_found() => {
                info!("initializing new lockfile");
                let lockfile = Lockfile::new();
                write_lockfile(bridge.as_ref(), &lockfile).await?;
                lockfile
            }
            Err(e) => return Err(e),
        };
        Ok(LockfileStore {
            bridge,
            state: Mutex::new(state),
        })
    }

    /// Persist the current lockfile state
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.lock().await;
        write_lockfile(self.bridge.as_ref(), &state).await
    }

    /// All tracked versions
    pub async fn versions(&self) -> Vec<String> {
        self.state.lock().await.versions.keys().cloned().collect()
    }

    /// The lockfile entry for one version
    pub async fn entry(&self, version: &str) -> Option<VersionEntry> {
        self.state.lock().await.versions.get(version).cloned()
    }

    /// A read-only copy of the whole lockfile document
    pub async fn current(&self) -> Lockfile {
        self.state.lock().await.clone()
    }

    /// Load a version's snapshot, if one exists
    pub async fn snapshot(&self, version: &str) -> Result<Option<Snapshot>> {
        match self.bridge.read(&snapshot_path(version)).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                snapshot.validate()?;
                Ok(Some(snapshot))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Record a completed mirror of a version as one logical unit
    ///
    /// Writes the snapshot document, then updates and flushes the lockfile
    /// entry, all under the single-writer lock.
    pub async fn record_version(&self, version: &str, snapshot: &Snapshot) -> Result<()> {
        snapshot.validate()?;
        let mut state = self.state.lock().await;

        let body = serde_json::to_vec_pretty(snapshot)?;
        self.bridge.write(&snapshot_path(version), &body).await?;

        state.versions.insert(
            version.to_string(),
            VersionEntry {
                path: version.to_string(),
                file_count: snapshot.files.len() as u64,
                total_size: snapshot.total_size(),
            },
        );
        write_lockfile(self.bridge.as_ref(), &state).await?;
        debug!(version, files = snapshot.files.len(), "recorded version");
        Ok(())
    }

    /// Drop a version's lockfile entry and snapshot as one logical unit
    pub async fn remove_version(&self, version: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        match self.bridge.remove(&snapshot_path(version)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if state.versions.remove(version).is_some() {
            write_lockfile(self.bridge.as_ref(), &state).await?;
            debug!(version, "removed version from lockfile");
        }
        Ok(())
    }
}

async fn write_lockfile(bridge: &dyn FileSystemBridge, lockfile: &Lockfile) -> Result<()> {
    let body = serde_json::to_vec_pretty(lockfile)?;
    bridge.write(LOCKFILE_NAME, &body).await
}
