//! Local disk backend for the filesystem bridge
//!
//! Maps resolved virtual paths onto a real directory tree under a configured
//! root. All I/O goes through `tokio::fs`; the boundary check happens in
//! [`resolve`](crate::bridge::FileSystemBridge::resolve) before any path
//! reaches the disk.

use crate::bridge::FileSystemBridge;
use crate::error::{MirrorError, Result};
use crate::path::{Boundary, ResolvedPath};
use crate::types::{FileEntry, FileKind, FileStat};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

/// Filesystem bridge over a local directory tree
///
/// # Examples
///
/// ```rust,no_run
/// use ucd_mirror::local::LocalBridge;
/// use ucd_mirror::bridge::FileSystemBridge;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ucd_mirror::Result<()> {
/// let bridge = LocalBridge::new("./mirror")?;
/// bridge.write("v16.0.0/ReadMe.txt", b"hello").await?;
/// assert!(bridge.exists("v16.0.0/ReadMe.txt").await?);
///
/// // Escapes are rejected before touching the disk
/// assert!(bridge.read("../../etc/passwd").await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LocalBridge {
    root: PathBuf,
    boundary: Boundary,
}

impl LocalBridge {
    /// Create a bridge rooted at a local directory, creating it if absent
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let boundary = Boundary::new(root.to_string_lossy());
        debug!(root = %root.display(), "opened local bridge");
        Ok(LocalBridge { root, boundary })
    }

    /// The real directory this bridge is rooted at
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resolved virtual path onto the real tree
    fn target(&self, resolved: &ResolvedPath) -> PathBuf {
        let mut target = self.root.clone();
        for segment in resolved.relative().split('/').filter(|s| !s.is_empty()) {
            target.push(segment);
        }
        target
    }

    fn map_io(&self, err: std::io::Error, resolved: &ResolvedPath) -> MirrorError {
        if err.kind() == std::io::ErrorKind::NotFound {
            MirrorError::not_found(resolved.as_str().to_string())
        } else {
            MirrorError::Io(err)
        }
    }
}

#[async_trait]
impl FileSystemBridge for LocalBridge {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        fs::read(self.target(&resolved))
            .await
            .map_err(|e| self.map_io(e, &resolved))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let resolved = self.resolve(path)?;
        let target = self.target(&resolved);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, content).await?;
        trace!(path = %resolved, bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        Ok(fs::try_exists(self.target(&resolved)).await?)
    }

    async fn stat(&self, path: &str) -> Result<FileStat> {
        let resolved = self.resolve(path)?;
        let metadata = fs::metadata(self.target(&resolved))
            .await
            .map_err(|e| self.map_io(e, &resolved))?;
        Ok(if metadata.is_dir() {
            FileStat {
                kind: FileKind::Directory,
                size: None,
            }
        } else {
            FileStat {
                kind: FileKind::File,
                size: Some(metadata.len()),
            }
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let resolved = self.resolve(path)?;
        let mut reader = fs::read_dir(self.target(&resolved))
            .await
            .map_err(|e| self.map_io(e, &resolved))?;

        let prefix = resolved.relative().to_string();
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let virtual_path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };
            let metadata = entry.metadata().await?;
            let modified = metadata.modified().ok();
            entries.push(if metadata.is_dir() {
                FileEntry {
                    name,
                    path: virtual_path,
                    size: None,
                    modified,
                    kind: FileKind::Directory,
                }
            } else {
                FileEntry {
                    name,
                    path: virtual_path,
                    size: Some(metadata.len()),
                    modified,
                    kind: FileKind::File,
                }
            });
        }
        Ok(entries)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        let target = self.target(&resolved);
        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| self.map_io(e, &resolved))?;
        if metadata.is_dir() {
            fs::remove_dir(&target)
                .await
                .map_err(|e| self.map_io(e, &resolved))?;
        } else {
            fs::remove_file(&target)
                .await
                .map_err(|e| self.map_io(e, &resolved))?;
        }
        trace!(path = %resolved, "removed entry");
        Ok(())
    }
}
