//! # edgequake-mdrelink
//!
//! Rewrite the image paths of a Markdown document so they point at a new
//! location: a configurable prefix and, optionally, a new file extension.
//!
//! Typical use is moving locally referenced images (`![](../drafts/img/a.png)`)
//! to an upload folder or CDN prefix (`![](upload/a.png)`) without editing
//! every link by hand. Everything that is not a local image path is copied
//! through byte for byte.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Scan      find ![alt](path) and <img src> outside code
//!  ├─ 2. Classify  skip URLs, data URIs and already-converted paths
//!  ├─ 3. Rewrite   prefix/filename, optional extension swap
//!  └─ 4. Splice    change list + rewritten text (atomic save)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use edgequake_mdrelink::{preview, ConversionConfig};
//!
//! let config = ConversionConfig::new("upload", "webp").unwrap();
//! let doc = "![cat](imgs/cat.png)\n\n![logo](https://example.com/logo.svg)\n";
//! let result = preview(doc, &config);
//!
//! assert_eq!(result.changes.len(), 1);
//! assert_eq!(result.changes[0].new_path, "upload/cat.webp");
//! ```
//!
//! Saving goes through [`convert_and_save`] (in place) or
//! [`convert_and_save_as`] (new file); both write atomically.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdrelink` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, DEFAULT_PREFIX};
pub use convert::{
    convert_and_save, convert_and_save_as, convert_and_save_as_with, convert_and_save_with,
    convert_files, convert_files_with, preview,
};
pub use error::{FileError, RelinkError};
pub use output::{
    BatchReport, BatchStats, Change, ConversionResult, FileReport, ImageReference,
    PathClassification, ReferenceKind,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{read_document, DocumentStore, FsStore};
