//! Error types for the ucd-mirror library
//!
//! This module defines all error types that can occur during mirror operations.
//! Errors are designed to be informative and actionable, providing clear context
//! about what went wrong.
//!
//! Two variants carry hard guarantees:
//!
//! - [`MirrorError::PathTraversal`] is raised synchronously before any I/O and
//!   its display string is a compatibility contract consumed by callers.
//! - [`MirrorError::InvalidArgument`] is raised synchronously before any I/O.
//!
//! Transient per-file errors (network, I/O) are collected into result objects
//! by the mirror and clean engines rather than propagated, so that one file's
//! failure never aborts sibling work.

use thiserror::Error;

/// Type alias for Results in the ucd-mirror library
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Main error type for all mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network errors from the HTTP backend
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A resolved path escaped its configured boundary
    ///
    /// The message format is a compatibility contract and must not change.
    #[error("Path traversal detected: attempted to access '{resolved}' which is outside the allowed base path '{boundary}'")]
    PathTraversal {
        /// The path the input would have resolved to
        resolved: String,
        /// The boundary the path escaped
        boundary: String,
    },

    /// A requested file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An argument failed validation before any I/O was attempted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Content hash did not match the recorded snapshot hash
    #[error("Integrity error for '{path}' - expected: {expected}, actual: {actual}")]
    Integrity {
        /// Path of the mismatched file
        path: String,
        /// Hash recorded in the snapshot
        expected: String,
        /// Hash computed from the current content
        actual: String,
    },

    /// An in-flight operation was cancelled through its abort signal
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The manifest for a version could not be obtained
    #[error("Manifest unavailable for version {version}: {reason}")]
    Manifest {
        /// Dataset version whose manifest failed
        version: String,
        /// Underlying failure description
        reason: String,
    },

    /// The lockfile on disk does not match the expected schema
    #[error("Invalid lockfile: {0}")]
    InvalidLockfile(String),

    /// A snapshot document does not match the expected schema
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The operation is not supported by this backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MirrorError {
    /// Create a path traversal error for a resolved path and its boundary
    pub fn traversal(resolved: impl Into<String>, boundary: impl Into<String>) -> Self {
        MirrorError::PathTraversal {
            resolved: resolved.into(),
            boundary: boundary.into(),
        }
    }

    /// Create a not-found error with a custom message
    pub fn not_found(msg: impl Into<String>) -> Self {
        MirrorError::NotFound(msg.into())
    }

    /// Create an invalid-argument error with a custom message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        MirrorError::InvalidArgument(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        MirrorError::Internal(msg.into())
    }

    /// Check if this error is a boundary violation
    ///
    /// Traversal errors are always fatal for the call that produced them and
    /// are never retried.
    pub fn is_traversal(&self) -> bool {
        matches!(self, MirrorError::PathTraversal { .. })
    }

    /// Check if this error means the target does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            MirrorError::NotFound(_) => true,
            MirrorError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this error is transient and could succeed on retry
    ///
    /// Retry policy belongs to the caller; this predicate only classifies.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MirrorError::Network(_) | MirrorError::Io(_) | MirrorError::Cancelled(_)
        )
    }
}
