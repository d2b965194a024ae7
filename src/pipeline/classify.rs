//! Path classifier: decide whether a reference is eligible for rewriting.
//!
//! A path is [`PathClassification::External`] when it carries a URL scheme
//! (`https://`, `ftp://`, `file://`, ...), is a `data:` URI, is
//! protocol-relative (`//cdn/...`), is a bare `#fragment`, has no filename
//! to carry over (`/`, `?v=1`), or already sits under the target prefix. The
//! last rule makes a second conversion with the same config a no-op.

use super::rewrite::{file_name, split_suffix};
use crate::config::ConversionConfig;
use crate::output::PathClassification;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://|(?i:data):)").unwrap());

/// Classify a raw path as written in the document.
pub fn classify(path: &str, config: &ConversionConfig) -> PathClassification {
    let path = path.trim();
    if path.is_empty()
        || RE_URL_SCHEME.is_match(path)
        || path.starts_with("//")
        || path.starts_with('#')
        || file_name(split_suffix(path).0).is_none()
        || is_under_prefix(path, config.normalised_prefix())
    {
        PathClassification::External
    } else {
        PathClassification::Local
    }
}

/// `true` if `path` already starts with `prefix` followed by a separator.
///
/// Backslashes count as separators on both sides.
fn is_under_prefix(path: &str, prefix: &str) -> bool {
    let path = path.replace('\\', "/");
    if prefix == "/" {
        return path.starts_with('/');
    }
    let prefix = prefix.replace('\\', "/");
    path.strip_prefix(prefix.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(prefix: &str) -> ConversionConfig {
        ConversionConfig::new(prefix, "").unwrap()
    }

    #[test]
    fn relative_paths_are_local() {
        let c = cfg("upload");
        assert_eq!(classify("imgs/photo.png", &c), PathClassification::Local);
        assert_eq!(classify("./photo.png", &c), PathClassification::Local);
        assert_eq!(classify("../assets/a.jpg", &c), PathClassification::Local);
        assert_eq!(classify("/abs/a.jpg", &c), PathClassification::Local);
    }

    #[test]
    fn windows_paths_are_local() {
        let c = cfg("upload");
        assert_eq!(classify(r"C:\Users\me\a.png", &c), PathClassification::Local);
        assert_eq!(classify(r"imgs\a.png", &c), PathClassification::Local);
    }

    #[test]
    fn urls_are_external() {
        let c = cfg("upload");
        for p in [
            "http://example.com/a.png",
            "https://example.com/a.png",
            "HTTPS://EXAMPLE.COM/A.PNG",
            "ftp://host/a.png",
            "file:///tmp/a.png",
            "data:image/png;base64,AAAA",
            "DATA:image/gif;base64,R0lG",
            "//cdn.example.com/a.png",
            "#figure-1",
        ] {
            assert_eq!(classify(p, &c), PathClassification::External, "{p}");
        }
    }

    #[test]
    fn paths_without_filename_are_external() {
        let c = cfg("upload");
        for p in ["/", "///", "?v=1"] {
            assert_eq!(classify(p, &c), PathClassification::External, "{p}");
        }
        assert_eq!(classify("a.png?v=1", &c), PathClassification::Local);
    }

    #[test]
    fn already_under_prefix_is_external() {
        let c = cfg("upload");
        assert_eq!(classify("upload/a.png", &c), PathClassification::External);
        assert_eq!(classify(r"upload\a.png", &c), PathClassification::External);
        assert_eq!(classify("uploads/a.png", &c), PathClassification::Local);
        assert_eq!(classify("upload", &c), PathClassification::Local);
    }

    #[test]
    fn prefix_with_trailing_slash() {
        let c = cfg("static/img/");
        assert_eq!(classify("static/img/a.png", &c), PathClassification::External);
        assert_eq!(classify("static/a.png", &c), PathClassification::Local);
    }

    #[test]
    fn root_prefix() {
        let c = cfg("/");
        assert_eq!(classify("/a.png", &c), PathClassification::External);
        assert_eq!(classify("a.png", &c), PathClassification::Local);
    }
}
