//! Boundary-enforcing virtual path resolution
//!
//! This module is the security core of the library. Every path a caller hands
//! to a [`FileSystemBridge`](crate::bridge::FileSystemBridge) passes through
//! [`resolve`] before any storage or network access, guaranteeing that the
//! resolved path equals the configured [`Boundary`] or is strictly nested
//! beneath it.
//!
//! Resolution is pure and synchronous; it never touches the filesystem. The
//! algorithm defends against the usual traversal tricks:
//!
//! - `..` segments popping past the boundary (including after normalization)
//! - mixed `\` / `/` separators
//! - single and double percent-encoding of `.` and `/` (decoding is iterative
//!   with a bounded pass count, renormalizing separators after each pass)
//! - absolute-looking inputs, which are treated as relative to the boundary
//!   rather than as OS-absolute paths
//!
//! An input of `""`, whitespace, `.`, `./`, or `/` resolves to the boundary
//! unchanged.

use crate::error::{MirrorError, Result};
use std::fmt;

/// Maximum number of percent-decoding passes applied to an input
///
/// Two passes catch double encoding (`%252e` -> `%2e` -> `.`); the extra
/// headroom costs nothing and any sequence still encoded after the final pass
/// is treated as literal text.
const MAX_DECODE_PASSES: usize = 4;

/// A root directory or URL pathname prefix that scopes a filesystem bridge
///
/// The boundary is stored in normalized form: forward slashes only, no
/// trailing slash (except the bare root `/`), no repeated separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    display: String,
    segments: Vec<String>,
    absolute: bool,
}

impl Boundary {
    /// Create a boundary from a root directory path or URL pathname prefix
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().replace('\\', "/");
        let absolute = normalized.starts_with('/');
        let segments: Vec<String> = normalized
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|s| s.to_string())
            .collect();

        let mut display = if absolute { "/".to_string() } else { String::new() };
        display.push_str(&segments.join("/"));
        if display.is_empty() {
            display.push('/');
        }

        Boundary {
            display,
            segments,
            absolute,
        }
    }

    /// The normalized boundary string
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Join a boundary-relative path onto the boundary
    fn join(&self, relative: &str) -> String {
        if relative.is_empty() {
            self.display.clone()
        } else if self.display == "/" {
            format!("/{}", relative)
        } else {
            format!("{}/{}", self.display, relative)
        }
    }

    /// Build the path an escaping input would have reached, for error display
    fn escaped_path(&self, underflow: usize, kept: &[&str]) -> String {
        let remain = self.segments.len().saturating_sub(underflow);
        let mut parts: Vec<&str> = self.segments[..remain].iter().map(|s| s.as_str()).collect();
        parts.extend_from_slice(kept);
        let joined = parts.join("/");
        if self.absolute || self.display == "/" {
            format!("/{}", joined)
        } else {
            joined
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// A successfully resolved virtual path, proven to live inside its boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    full: String,
    relative: String,
}

impl ResolvedPath {
    /// The full path, boundary included
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The boundary-relative portion (empty when the path is the boundary)
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this path is the boundary itself
    pub fn is_boundary(&self) -> bool {
        self.relative.is_empty()
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Resolve a caller-supplied virtual path against a boundary
///
/// Returns the normalized boundary-relative path, guaranteed to be the
/// boundary itself or strictly nested beneath it, or fails with
/// [`MirrorError::PathTraversal`]. Never performs I/O.
///
/// # Examples
///
/// ```rust
/// use ucd_mirror::path::{resolve, Boundary};
///
/// let boundary = Boundary::new("/files");
/// assert_eq!(
///     resolve(&boundary, "subdir/../file.txt").unwrap().as_str(),
///     "/files/file.txt"
/// );
/// assert!(resolve(&boundary, "../outside.txt").is_err());
/// ```
pub fn resolve(boundary: &Boundary, input: &str) -> Result<ResolvedPath> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(ResolvedPath {
            full: boundary.as_str().to_string(),
            relative: String::new(),
        });
    }

    // Normalize separators, then decode iteratively. Each pass renormalizes
    // backslashes so an encoded `\` cannot survive as a separator in disguise.
    let mut current = trimmed.replace('\\', "/");
    for _ in 0..MAX_DECODE_PASSES {
        let decoded = percent_decode(&current)?.replace('\\', "/");
        if decoded == current {
            break;
        }
        current = decoded;
    }

    // A leading slash means "relative to the boundary", never OS-absolute.
    // Splitting on '/' also collapses repeated separators (empty segments).
    let mut kept: Vec<&str> = Vec::new();
    let mut underflow = 0usize;
    for segment in current.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if kept.pop().is_none() {
                    underflow += 1;
                }
            }
            other => kept.push(other),
        }
    }

    if underflow > 0 {
        let resolved = boundary.escaped_path(underflow, &kept);
        trace_rejection(boundary, input, &resolved);
        return Err(MirrorError::traversal(resolved, boundary.as_str()));
    }

    let relative = kept.join("/");
    Ok(ResolvedPath {
        full: boundary.join(&relative),
        relative,
    })
}

fn trace_rejection(boundary: &Boundary, input: &str, resolved: &str) {
    tracing::warn!(
        boundary = %boundary,
        input,
        resolved,
        "rejected path escaping its boundary"
    );
}

/// Decode one pass of percent-encoding
///
/// Malformed sequences (`%` not followed by two hex digits) are kept literal.
/// Decoded bytes must form valid UTF-8; anything else is rejected outright
/// rather than interpreted.
fn percent_decode(input: &str) -> Result<String> {
    if !input.contains('%') {
        return Ok(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).map_err(|_| {
        MirrorError::invalid_argument("percent-decoded path is not valid UTF-8")
    })
}

fn hex_val(b: Option<&u8>) -> Option<u8> {
    match b {
        Some(c @ b'0'..=b'9') => Some(c - b'0'),
        Some(c @ b'a'..=b'f') => Some(c - b'a' + 10),
        Some(c @ b'A'..=b'F') => Some(c - b'A' + 10),
        _ => None,
    }
}
