//! In-memory backend for the filesystem bridge
//!
//! A test and development backend with the same contract as the local disk
//! backend, including the boundary check. Directories are implicit: they
//! exist exactly while a file lives beneath them, which matches how the
//! engines observe directories (listing and pruning).
//!
//! Fixtures can be seeded directly:
//!
//! ```rust
//! use ucd_mirror::memory::MemoryBridge;
//! use ucd_mirror::bridge::FileSystemBridge;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ucd_mirror::Result<()> {
//! let remote = MemoryBridge::new("/files");
//! remote.seed(&[("v16.0.0/ucd/UnicodeData.txt", b"0000;NULL" as &[u8])])?;
//! assert!(remote.exists("v16.0.0/ucd/UnicodeData.txt").await?);
//! # Ok(())
//! # }
//! ```

use crate::bridge::FileSystemBridge;
use crate::error::{MirrorError, Result};
use crate::types::{FileEntry, FileKind, FileStat};
use crate::path::Boundary;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Filesystem bridge over an in-memory map of files
#[derive(Debug)]
pub struct MemoryBridge {
    boundary: Boundary,
    files: DashMap<String, Vec<u8>>,
}

impl MemoryBridge {
    /// Create an empty in-memory bridge scoped to a virtual boundary
    pub fn new(boundary: impl AsRef<str>) -> Self {
        MemoryBridge {
            boundary: Boundary::new(boundary),
            files: DashMap::new(),
        }
    }

    /// Seed fixture files without going through async I/O
    ///
    /// Paths are still resolved against the boundary, so fixtures cannot
    /// accidentally sit outside it.
    pub fn seed(&self, entries: &[(&str, &[u8])]) -> Result<()> {
        for (path, content) in entries {
            let resolved = self.resolve(path)?;
            self.files
                .insert(resolved.relative().to_string(), content.to_vec());
        }
        Ok(())
    }

    /// Number of files currently stored
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the bridge holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_dir(&self, relative: &str) -> bool {
        if relative.is_empty() {
            return true;
        }
        let prefix = format!("{}/", relative);
        self.files.iter().any(|e| e.key().starts_with(&prefix))
    }
}

#[async_trait]
impl FileSystemBridge for MemoryBridge {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        self.files
            .get(resolved.relative())
            .map(|e| e.value().clone())
            .ok_or_else(|| MirrorError::not_found(resolved.as_str().to_string()))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let resolved = self.resolve(path)?;
        if resolved.is_boundary() {
            return Err(MirrorError::invalid_argument(
                "cannot write to the boundary itself",
            ));
        }
        self.files
            .insert(resolved.relative().to_string(), content.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        let relative = resolved.relative();
        Ok(self.files.contains_key(relative) || self.is_dir(relative))
    }

    async fn stat(&self, path: &str) -> Result<FileStat> {
        let resolved = self.resolve(path)?;
        let relative = resolved.relative();
        if let Some(entry) = self.files.get(relative) {
            return Ok(FileStat {
                kind: FileKind::File,
                size: Some(entry.value().len() as u64),
            });
        }
        if self.is_dir(relative) {
            return Ok(FileStat {
                kind: FileKind::Directory,
                size: None,
            });
        }
        Err(MirrorError::not_found(resolved.as_str().to_string()))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let resolved = self.resolve(path)?;
        let relative = resolved.relative();
        if self.files.contains_key(relative) {
            return Err(MirrorError::invalid_argument(format!(
                "not a directory: {}",
                resolved
            )));
        }
        if !self.is_dir(relative) {
            return Err(MirrorError::not_found(resolved.as_str().to_string()));
        }

        let prefix = if relative.is_empty() {
            String::new()
        } else {
            format!("{}/", relative)
        };

        // BTreeMap gives deterministic listing order, name -> file size or dir.
        let mut children: BTreeMap<String, Option<u64>> = BTreeMap::new();
        for entry in self.files.iter() {
            let Some(rest) = entry.key().strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    children.insert(dir.to_string(), None);
                }
                None => {
                    children.insert(rest.to_string(), Some(entry.value().len() as u64));
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, size)| FileEntry {
                path: format!("{}{}", prefix, name),
                kind: if size.is_some() {
                    FileKind::File
                } else {
                    FileKind::Directory
                },
                size,
                modified: None,
                name,
            })
            .collect())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        let relative = resolved.relative();
        if self.files.remove(relative).is_some() {
            return Ok(());
        }
        if self.is_dir(relative) {
            // Directories are implicit; a non-empty one cannot be removed and
            // an empty one does not exist.
            return Err(MirrorError::internal(format!(
                "directory not empty: {}",
                resolved
            )));
        }
        Err(MirrorError::not_found(resolved.as_str().to_string()))
    }
}
