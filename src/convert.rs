//! Conversion entry points.
//!
//! [`preview`] is the pure core: it scans, classifies, rewrites and splices,
//! and never touches a file. The `convert_and_save*` functions wrap it with
//! exactly one read and one write. [`convert_files`] runs in-place saves over
//! many files and reports per-file outcomes.

use crate::config::ConversionConfig;
use crate::error::{FileError, RelinkError};
use crate::output::{BatchReport, BatchStats, Change, ConversionResult, FileReport, PathClassification};
use crate::pipeline::{classify, rewrite, scan};
use crate::store::{DocumentStore, FsStore};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Compute the rewritten document and its change list.
///
/// Only the path text of `Local` references changes; every other byte of
/// `content` is copied through unchanged. Cheap enough to call on every
/// keystroke of a live preview.
///
/// # Example
/// ```rust
/// use edgequake_mdrelink::{preview, ConversionConfig};
///
/// let config = ConversionConfig::new("upload", "webp").unwrap();
/// let result = preview("![x](imgs/photo.png)", &config);
/// assert_eq!(result.new_content, "![x](upload/photo.webp)");
/// assert_eq!(result.changes.len(), 1);
/// ```
pub fn preview(content: &str, config: &ConversionConfig) -> ConversionResult {
    let mut changes = Vec::new();
    let mut new_content = String::with_capacity(content.len());
    let mut copied_up_to = 0;

    for reference in scan::scan(content, config.html_images) {
        if classify::classify(&reference.path, config) == PathClassification::External {
            debug!("line {}: keeping {}", reference.line, reference.path);
            continue;
        }

        let new_path = rewrite::rewrite(&reference.path, config);
        debug!("line {}: {} -> {}", reference.line, reference.path, new_path);

        new_content.push_str(&content[copied_up_to..reference.path_span.start]);
        new_content.push_str(&new_path);
        copied_up_to = reference.path_span.end;

        changes.push(Change {
            old_path: reference.path,
            new_path,
            line: reference.line,
            span: reference.path_span,
            kind: reference.kind,
        });
    }
    new_content.push_str(&content[copied_up_to..]);

    ConversionResult {
        changes,
        new_content,
    }
}

/// Rewrite the document at `path` in place.
///
/// Returns the number of paths rewritten. The write is atomic: if it fails,
/// the file on disk still holds its original bytes.
pub fn convert_and_save(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<usize, RelinkError> {
    convert_and_save_with(&FsStore, path, config)
}

/// Rewrite `source` into `target`, leaving `source` untouched.
///
/// Missing parent directories of `target` are created. Returns the number of
/// paths rewritten.
pub fn convert_and_save_as(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<usize, RelinkError> {
    convert_and_save_as_with(&FsStore, source, target, config)
}

/// [`convert_and_save`] against any [`DocumentStore`].
pub fn convert_and_save_with<S: DocumentStore + ?Sized>(
    store: &S,
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<usize, RelinkError> {
    let path = path.as_ref();
    let content = store.read(path)?;
    let result = preview(&content, config);
    store.write(path, &result.new_content)?;

    info!("Rewrote {} image paths in {}", result.changes.len(), path.display());
    Ok(result.changes.len())
}

/// [`convert_and_save_as`] against any [`DocumentStore`].
pub fn convert_and_save_as_with<S: DocumentStore + ?Sized>(
    store: &S,
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<usize, RelinkError> {
    let (source, target) = (source.as_ref(), target.as_ref());
    let content = store.read(source)?;
    let result = preview(&content, config);
    store.write(target, &result.new_content)?;

    info!(
        "Rewrote {} image paths from {} into {}",
        result.changes.len(),
        source.display(),
        target.display()
    );
    Ok(result.changes.len())
}

/// Rewrite each file in place, continuing past failures.
///
/// Files are processed in order, one at a time. A file that cannot be read
/// or saved gets a [`FileError`] in its report; the others still convert.
/// Fires the configured progress callback for every file.
pub fn convert_files<P: AsRef<Path>>(paths: &[P], config: &ConversionConfig) -> BatchReport {
    convert_files_with(&FsStore, paths, config)
}

/// [`convert_files`] against any [`DocumentStore`].
pub fn convert_files_with<S, P>(store: &S, paths: &[P], config: &ConversionConfig) -> BatchReport
where
    S: DocumentStore + ?Sized,
    P: AsRef<Path>,
{
    let start = Instant::now();
    let total = paths.len();
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    let mut files = Vec::with_capacity(total);
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let index = i + 1;
        if let Some(cb) = cb {
            cb.on_file_start(index, total, path);
        }

        let report = match convert_and_save_with(store, path, config) {
            Ok(changes) => {
                if let Some(cb) = cb {
                    cb.on_file_complete(index, total, path, changes);
                }
                FileReport {
                    path: path.to_path_buf(),
                    changes,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                if let Some(cb) = cb {
                    cb.on_file_error(index, total, path, &e.to_string());
                }
                FileReport {
                    path: path.to_path_buf(),
                    changes: 0,
                    error: Some(FileError::from(&e)),
                }
            }
        };
        files.push(report);
    }

    let failed = files.iter().filter(|f| f.error.is_some()).count();
    let stats = BatchStats {
        total_files: total,
        converted_files: total - failed,
        failed_files: failed,
        total_changes: files.iter().map(|f| f.changes).sum(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} files, {} paths rewritten, {}ms",
        stats.converted_files, total, stats.total_changes, stats.duration_ms
    );

    if let Some(cb) = cb {
        cb.on_batch_complete(total, stats.converted_files);
    }

    BatchReport { files, stats }
}
