//! Result types produced by the conversion engine and the batch driver.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Syntax an image reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `![alt](path "title")`
    Markdown,
    /// `<img src="path">`
    Html,
}

/// One image occurrence found by the scanner.
///
/// Transient: produced by [`crate::pipeline::scan::scan`] and consumed by
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Byte range of the whole construct (`![..](..)` or `<img ..>`).
    pub span: Range<usize>,
    /// Byte range of the path text alone. Always inside `span`.
    pub path_span: Range<usize>,
    /// The path exactly as written.
    pub path: String,
    pub kind: ReferenceKind,
    /// 1-indexed line the reference starts on.
    pub line: usize,
}

/// Verdict of [`crate::pipeline::classify::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClassification {
    /// Relative or otherwise local path; eligible for rewriting.
    Local,
    /// URL, data URI, anchor or already converted; left untouched.
    External,
}

/// One recorded rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub old_path: String,
    pub new_path: String,
    /// 1-indexed line in the original document.
    pub line: usize,
    /// Byte range of `old_path` in the original document.
    pub span: Range<usize>,
    pub kind: ReferenceKind,
}

/// Output of [`crate::convert::preview`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Rewrites in document order, one per occurrence.
    pub changes: Vec<Change>,
    /// The full rewritten document.
    pub new_content: String,
}

impl ConversionResult {
    /// `true` when no reference was rewritten.
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Number of paths rewritten. Zero when `error` is set.
    pub changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub converted_files: usize,
    pub failed_files: usize,
    pub total_changes: usize,
    pub duration_ms: u64,
}

/// Output of [`crate::convert::convert_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per input, in input order.
    pub files: Vec<FileReport>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Iterate over the failures only.
    pub fn errors(&self) -> impl Iterator<Item = &FileError> {
        self.files.iter().filter_map(|f| f.error.as_ref())
    }
}
