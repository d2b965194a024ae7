//! Path rewriter: compute the replacement for a local image path.
//!
//! The rewrite always flattens to `prefix/filename`, optionally swapping the
//! filename's extension. Directory components of the original are dropped.
//! A `?query` or `#fragment` suffix is carried over unchanged.
//!
//! Both `/` and `\` separate segments, except that a backslash in front of
//! other ASCII punctuation is a Markdown escape (`my\_photo.png`) and stays
//! part of the filename.

use crate::config::ConversionConfig;

/// Compute the new path for a `Local` reference.
///
/// Pure and deterministic: the same input and config always give the same
/// output. A path with no filename to carry over (`/`, `?x`) is returned
/// unchanged; the classifier never marks those `Local`.
pub fn rewrite(path: &str, config: &ConversionConfig) -> String {
    let path = path.trim();
    let (body, suffix) = split_suffix(path);
    let Some(filename) = file_name(body) else {
        return path.to_string();
    };
    let filename = replace_extension(filename, &config.target_extension);
    let joined = join_prefix(config.normalised_prefix(), &filename);
    format!("{joined}{suffix}")
}

/// Split at the first `?` or `#`.
pub(super) fn split_suffix(path: &str) -> (&str, &str) {
    match path.find(['?', '#']) {
        Some(i) => path.split_at(i),
        None => (path, ""),
    }
}

/// Last non-empty segment, or `None` if there is none.
pub(super) fn file_name(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    let mut last = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).copied().is_some_and(is_escaped_literal) => {
                i += 2;
                continue;
            }
            b'/' | b'\\' => {
                if i > start {
                    last = Some(&path[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        last = Some(&path[start..]);
    }
    last
}

/// Punctuation a backslash escapes into the filename. Escaped separators
/// still separate.
fn is_escaped_literal(b: u8) -> bool {
    b.is_ascii_punctuation() && b != b'/' && b != b'\\'
}

fn replace_extension(filename: &str, ext: &str) -> String {
    if ext.is_empty() {
        return filename.to_string();
    }
    // A leading dot marks a hidden file, not an extension.
    let stem = match filename.rfind('.') {
        Some(i) if i > 0 => &filename[..i],
        _ => filename,
    };
    format!("{stem}.{ext}")
}

fn join_prefix(prefix: &str, filename: &str) -> String {
    if prefix == "/" {
        format!("/{filename}")
    } else {
        format!("{prefix}/{filename}")
    }
}
