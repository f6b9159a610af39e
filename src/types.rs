//! Core data types used throughout the ucd-mirror library
//!
//! This module contains the data structures shared across components:
//!
//! - **File system state**: [`FileEntry`], [`FileStat`], [`FileKind`]
//! - **Operation parameters**: [`MirrorOptions`], [`CleanOptions`]
//! - **Operation results**: [`MirrorResult`], [`CleanResult`], [`FileFailure`]
//! - **Configuration**: [`MirrorConfig`]
//!
//! Result objects are the unit of error reporting for batch work: per-file
//! failures are collected into them so that one failure never aborts sibling
//! work. Outer layers (CLIs, services) derive exit codes and response bodies
//! from these structures.

use crate::limiter::Concurrency;
use serde::{Deserialize, Serialize};

/// Kind of entry returned by `stat` and `list_dir`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// A directory listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Final path component
    pub name: String,
    /// Boundary-relative virtual path
    pub path: String,
    /// Size in bytes, when the backend can report one
    pub size: Option<u64>,
    /// Last modification time, when the backend can report one
    pub modified: Option<std::time::SystemTime>,
    /// Whether this entry is a file or a directory
    pub kind: FileKind,
}

/// Metadata for a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Whether the path is a file or a directory
    pub kind: FileKind,
    /// Size in bytes, when known (directories report `None`)
    pub size: Option<u64>,
}

impl FileStat {
    /// Whether this stat describes a regular file
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// A single file's failure within a batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Virtual path of the file that failed
    pub path: String,
    /// Display form of the underlying error
    pub error: String,
}

impl FileFailure {
    /// Record a failure for a path
    pub fn new(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        FileFailure {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// Options for a mirror operation
#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    /// Compute and report the target set without fetching or writing
    pub dry_run: bool,
    /// Re-fetch every expected file, not just missing ones
    pub force: bool,
    /// Override the store's default concurrency bound for this batch
    pub concurrency: Option<Concurrency>,
}

/// Result of mirroring one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorResult {
    /// Version that was mirrored
    pub version: String,
    /// Files fetched and written during this run
    pub mirrored: Vec<String>,
    /// Per-file failures; sibling files still completed
    pub failed: Vec<FileFailure>,
    /// Expected files already present and left untouched
    pub skipped: Vec<String>,
    /// The computed target set (what a non-dry run would fetch)
    pub planned: Vec<String>,
    /// Total bytes written to the local store
    pub bytes_written: u64,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl MirrorResult {
    /// Whether every planned file was mirrored (vacuously true for dry runs)
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Options for a clean operation
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Versions to clean; `None` cleans every tracked version
    pub versions: Option<Vec<String>>,
    /// Compute and report the candidate set without deleting
    pub dry_run: bool,
}

/// Result of cleaning one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResult {
    /// Version that was cleaned
    pub version: String,
    /// Files removed (or, for dry runs, that would be removed)
    pub deleted: Vec<String>,
    /// Per-file failures; sibling deletions still completed
    pub failed: Vec<FileFailure>,
    /// Orphan files included in the candidate set
    pub orphans: Vec<String>,
    /// Total bytes freed, where sizes could be determined
    pub bytes_freed: u64,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl CleanResult {
    fn empty(version: &str, dry_run: bool) -> Self {
        CleanResult {
            version: version.to_string(),
            deleted: Vec::new(),
            failed: Vec::new(),
            orphans: Vec::new(),
            bytes_freed: 0,
            dry_run,
        }
    }

    /// A result carrying a single version-level failure
    ///
    /// Used when a version cannot be cleaned at all (for example its tracked
    /// file set cannot be determined); other versions still proceed.
    pub fn version_failure(version: &str, dry_run: bool, error: impl std::fmt::Display) -> Self {
        let mut result = CleanResult::empty(version, dry_run);
        result.failed.push(FileFailure::new(version, error));
        result
    }
}

/// Configuration for a mirror store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Root directory of the local mirror
    pub root_path: String,
    /// Base URL of the remote dataset
    pub remote_base: String,
    /// Default concurrency bound for mirror and clean batches
    pub concurrency: usize,
    /// Whether clean removes files not present in the manifest
    pub remove_orphans: bool,
    /// Library version that created this configuration
    pub version: String,
}
