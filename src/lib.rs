//! # ucd-mirror - Boundary-enforced mirroring of Unicode data releases
//!
//! A library for replicating a large, versioned, immutable remote dataset
//! (Unicode Character Database releases) into a local store, built on a
//! boundary-enforcing virtual filesystem abstraction.
//!
//! ## Overview
//!
//! ucd-mirror gives you a content-addressable local mirror with three hard
//! guarantees:
//!
//! - **No escape**: every caller-supplied path is canonicalized and checked
//!   against a configured boundary before any I/O; traversal attempts
//!   (including percent-encoded and mixed-separator ones) fail loudly.
//! - **Bounded concurrency**: downloads and deletes run through a FIFO
//!   limiter capping simultaneously in-flight operations.
//! - **Convergence**: a durable lockfile plus per-version snapshots record
//!   sha-256 hashes for every mirrored file, so repeated mirror/clean cycles
//!   settle into a known, verifiable state.
//!
//! ## Architecture
//!
//! - [`path`]: pure path canonicalization and the boundary check
//! - [`bridge`]: the filesystem capability interface, with backends in
//!   [`local`] (disk), [`memory`] (tests/fixtures), and [`http`] (read-only
//!   remote)
//! - [`limiter`]: bounded-parallelism task runner
//! - [`manifest`]: expected-file manifests and the pure set diff
//! - [`mirror`] / [`clean`]: the batch engines with all-settled semantics
//! - [`lockfile`]: the durable version index and per-version snapshots
//! - [`verify`]: hash verification of mirrored content against snapshots
//! - [`store`]: the [`MirrorStore`] handle tying everything together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ucd_mirror::{MirrorStore, MirrorOptions, CleanOptions};
//! use ucd_mirror::manifest::StaticManifestSource;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> ucd_mirror::Result<()> {
//! let manifests = Arc::new(StaticManifestSource::new());
//! manifests.insert("16.0.0", &["ReadMe.txt", "ucd/UnicodeData.txt"]);
//!
//! let store = MirrorStore::open(
//!     "./mirror",
//!     "https://www.unicode.org/Public",
//!     manifests,
//! ).await?;
//!
//! // Fetch whatever the manifest expects and the store lacks
//! let result = store.mirror("16.0.0", &MirrorOptions::default()).await?;
//! println!("mirrored {}, failed {}", result.mirrored.len(), result.failed.len());
//!
//! // Check the replica against its recorded hashes
//! let report = store.verify("16.0.0").await?;
//! assert!(report.is_valid());
//!
//! // Remove it again, orphans included
//! let cleaned = store.clean(&CleanOptions {
//!     versions: Some(vec!["16.0.0".to_string()]),
//!     ..Default::default()
//! }).await;
//! println!("deleted {} files", cleaned[0].deleted.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Boundary violations ([`MirrorError::PathTraversal`]) and invalid arguments
//! are raised synchronously before any I/O and always surface to the caller.
//! Transient per-file errors inside a mirror or clean batch are collected
//! into the batch's result object instead, so one file's failure never aborts
//! sibling work. Retry policy is deliberately not built in; the HTTP backend
//! accepts an injectable [`http::RetryPolicy`].

// Public API modules
pub mod bridge;
pub mod clean;
pub mod error;
pub mod http;
pub mod limiter;
pub mod local;
pub mod lockfile;
pub mod manifest;
pub mod memory;
pub mod mirror;
pub mod path;
pub mod store;
pub mod types;
pub mod verify;

// Re-export main types for convenience
pub use bridge::FileSystemBridge;
pub use error::{MirrorError, Result};
pub use http::HttpBridge;
pub use limiter::{Concurrency, Limiter};
pub use local::LocalBridge;
pub use lockfile::{Lockfile, LockfileStore, Snapshot};
pub use manifest::{diff, ExpectedFile, ManifestDiff, ManifestSource, StaticManifestSource};
pub use memory::MemoryBridge;
pub use path::{resolve, Boundary, ResolvedPath};
pub use store::{MirrorStore, MirrorStoreBuilder};
pub use types::*;
pub use verify::VerificationReport;
