//! Capability interface over boundary-scoped storage backends
//!
//! [`FileSystemBridge`] is the sole I/O boundary of the library. Three
//! backends implement it: [`LocalBridge`](crate::local::LocalBridge) over a
//! real directory tree, [`MemoryBridge`](crate::memory::MemoryBridge) for
//! tests and fixtures, and [`HttpBridge`](crate::http::HttpBridge) as a
//! read-only remote view. All three share one contract, and the same
//! boundary-semantics test suite runs against each of them.
//!
//! Every method resolves its path through [`resolve`] **before** touching
//! storage or network; a rejected path never reaches the backend.

use crate::error::{MirrorError, Result};
use crate::path::{resolve, Boundary, ResolvedPath};
use crate::types::{FileEntry, FileKind, FileStat};
use async_trait::async_trait;
use std::collections::VecDeque;

/// Boundary-scoped filesystem capability
///
/// Paths are virtual: relative, absolute-looking, percent-encoded, and
/// mixed-separator inputs are all accepted and canonicalized against the
/// bridge's boundary. Implementations must route every path through
/// [`FileSystemBridge::resolve`] first.
#[async_trait]
pub trait FileSystemBridge: Send + Sync + std::fmt::Debug {
    /// The boundary this bridge is scoped to
    fn boundary(&self) -> &Boundary;

    /// Resolve a virtual path against this bridge's boundary
    ///
    /// Pure and synchronous; fails with [`MirrorError::PathTraversal`] before
    /// any I/O can happen.
    fn resolve(&self, path: &str) -> Result<ResolvedPath> {
        resolve(self.boundary(), path)
    }

    /// Read the full content of a file
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write content to a file, creating parent directories as needed
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Whether a file or directory exists at the path
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Metadata for a file or directory
    async fn stat(&self, path: &str) -> Result<FileStat>;

    /// List the direct children of a directory
    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>>;

    /// Remove a file, or a directory if it is empty
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Collect every file under a directory, recursively
///
/// Returns boundary-relative virtual paths. A missing directory yields an
/// empty list; the engines treat "nothing there yet" as an empty present set.
pub async fn walk_files(bridge: &dyn FileSystemBridge, path: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending: VecDeque<String> = VecDeque::new();
    pending.push_back(path.to_string());

    while let Some(dir) = pending.pop_front() {
        let entries = match bridge.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        for entry in entries {
            match entry.kind {
                FileKind::File => files.push(entry.path),
                FileKind::Directory => pending.push_back(entry.path),
            }
        }
    }

    Ok(files)
}

/// Remove empty directories under a path, deepest first
///
/// Returns the number of directories removed. The path itself is removed too
/// if it ends up empty.
pub async fn prune_empty_dirs(bridge: &dyn FileSystemBridge, path: &str) -> Result<usize> {
    // Collect the subtree breadth-first, then delete in reverse so children
    // go before parents.
    let mut dirs: Vec<String> = Vec::new();
    let mut pending: VecDeque<String> = VecDeque::new();
    pending.push_back(path.to_string());

    while let Some(dir) = pending.pop_front() {
        let entries = match bridge.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        dirs.push(dir);
        for entry in entries {
            if entry.kind == FileKind::Directory {
                pending.push_back(entry.path);
            }
        }
    }

    let mut removed = 0;
    for dir in dirs.iter().rev() {
        let empty = match bridge.list_dir(dir).await {
            Ok(entries) => entries.is_empty(),
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if empty {
            bridge.remove(dir).await?;
            removed += 1;
            tracing::trace!(dir, "pruned empty directory");
        }
    }

    Ok(removed)
}

/// Guard helper for read-only backends
pub(crate) fn read_only(op: &str, boundary: &Boundary) -> MirrorError {
    MirrorError::Unsupported(format!(
        "{} is not supported by the read-only backend at '{}'",
        op, boundary
    ))
}
