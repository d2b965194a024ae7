//! Error types for the edgequake-mdrelink library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RelinkError`] (**fatal**): the operation cannot proceed at all
//!   (source unreadable, target unwritable, invalid configuration). Returned
//!   as `Err(RelinkError)` from the top-level `convert*` functions.
//!
//! * [`FileError`] (**non-fatal**): one file of a batch failed while the
//!   others converted fine. Stored inside [`crate::output::FileReport`] so
//!   callers can inspect partial success instead of losing the whole batch
//!   to one unreadable file.
//!
//! Malformed Markdown is never an error. Anything that does not match a
//! recognised image shape is inert text and scanning simply continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-mdrelink library.
#[derive(Debug, Error)]
pub enum RelinkError {
    // ── Read errors ───────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the source document.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the source document.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Write errors ──────────────────────────────────────────────────────
    /// Could not create, write or replace the target document.
    ///
    /// When the target is the source itself, the original bytes are still on
    /// disk: the rewrite goes to a sibling temp file that only replaces the
    /// target once it is fully written.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RelinkError {
    /// `true` for failures to obtain the source text.
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            RelinkError::FileNotFound { .. }
                | RelinkError::PermissionDenied { .. }
                | RelinkError::ReadFailed { .. }
        )
    }

    /// `true` for failures to persist the rewritten text.
    pub fn is_write_error(&self) -> bool {
        matches!(self, RelinkError::WriteFailed { .. })
    }
}

/// A non-fatal error for a single file of a batch.
///
/// Stored alongside [`crate::output::FileReport`] when a file fails.
/// The batch continues with the remaining files.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The document could not be read; nothing was written.
    #[error("{path}: read failed: {detail}")]
    Read { path: PathBuf, detail: String },

    /// The rewritten document could not be saved; the original is intact.
    #[error("{path}: write failed: {detail}")]
    Write { path: PathBuf, detail: String },
}

impl From<&RelinkError> for FileError {
    fn from(e: &RelinkError) -> Self {
        let (path, detail) = match e {
            RelinkError::FileNotFound { path }
            | RelinkError::PermissionDenied { path }
            | RelinkError::ReadFailed { path, .. }
            | RelinkError::WriteFailed { path, .. } => (path.clone(), e.to_string()),
            RelinkError::InvalidConfig(msg) => (PathBuf::new(), msg.clone()),
        };
        if e.is_write_error() {
            FileError::Write { path, detail }
        } else {
            FileError::Read { path, detail }
        }
    }
}
