//! File operations: read a document, write rewritten text back.
//!
//! The engine talks to storage only through [`DocumentStore`], so callers can
//! run conversions against something other than the local filesystem (an
//! editor buffer, an in-memory map in tests). [`FsStore`] is the default.
//!
//! ## Atomic writes
//!
//! [`FsStore::write`] never truncates the target in place. It writes to a
//! temp file in the target's directory, flushes it, and renames it over the
//! target. A failure at any point before the rename leaves the target
//! exactly as it was, and the temp file is removed on drop. A symlinked
//! target is resolved first, so the link survives and its destination file
//! receives the new contents.

use crate::error::RelinkError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Storage backend for source and target documents.
pub trait DocumentStore {
    /// Return the full text of the document at `path`.
    fn read(&self, path: &Path) -> Result<String, RelinkError>;

    /// Replace the document at `path` with `contents`.
    ///
    /// Must either fully succeed or leave any existing document untouched.
    fn write(&self, path: &Path, contents: &str) -> Result<(), RelinkError>;
}

/// Local filesystem storage with atomic replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> Result<String, RelinkError> {
        read_document(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), RelinkError> {
        write_atomic_with(path, |file| file.write_all(contents.as_bytes())).map_err(|source| {
            RelinkError::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Read a Markdown document from disk.
///
/// Invalid UTF-8 is decoded lossily (invalid sequences become U+FFFD) so
/// documents saved in a legacy encoding can still be converted; a warning is
/// logged because saving such a document rewrites those bytes.
pub fn read_document(path: impl AsRef<Path>) -> Result<String, RelinkError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RelinkError::FileNotFound {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => RelinkError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RelinkError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(
                "{} is not valid UTF-8 (first bad byte at {}); decoding lossily",
                path.display(),
                e.utf8_error().valid_up_to()
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Write through `fill` into a sibling temp file, then rename it over `path`.
///
/// Parent directories are created as needed. When `path` already exists its
/// permissions are copied onto the replacement. Symlinks are followed: the
/// rename happens beside the file the link points at.
pub(crate) fn write_atomic_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let resolved = resolve_target(path);
    let path = resolved.as_path();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Replaced {}", path.display());
    Ok(())
}

/// The file a write to `path` should land in.
///
/// An existing path is canonicalised so symlinks are followed. A missing
/// path (or a dangling link) is used as given.
fn resolve_target(path: &Path) -> PathBuf {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}
