//! Configuration types for image-path conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. A config is supplied fresh with every
//! call; the library keeps no state between conversions.

use crate::error::RelinkError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Prefix used when the caller supplies a blank one.
pub const DEFAULT_PREFIX: &str = "upload";

/// Configuration for a Markdown image-path conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_mdrelink::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .target_prefix("assets/img")
///     .target_extension(".webp")
///     .build()
///     .unwrap();
/// assert_eq!(config.target_extension, "webp");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory or URL prefix every rewritten image is placed under.
    /// Default: `"upload"`.
    ///
    /// Stored trimmed; the builder replaces a blank value with
    /// [`DEFAULT_PREFIX`]. Trailing separators are tolerated and collapsed
    /// when joining, see [`ConversionConfig::normalised_prefix`].
    pub target_prefix: String,

    /// Extension applied to rewritten filenames, without the leading dot.
    /// Empty keeps each file's original extension. Default: empty.
    pub target_extension: String,

    /// Also rewrite `src` attributes of inline HTML `<img>` tags. Default: true.
    pub html_images: bool,

    /// Optional progress callback for batch conversions.
    ///
    /// Called once per file by [`crate::convert::convert_files`]. Single-file
    /// operations do not fire it.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target_prefix: DEFAULT_PREFIX.to_string(),
            target_extension: String::new(),
            html_images: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("target_prefix", &self.target_prefix)
            .field("target_extension", &self.target_extension)
            .field("html_images", &self.html_images)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Shorthand for a validated config with the given prefix and extension.
    pub fn new(
        target_prefix: impl Into<String>,
        target_extension: impl Into<String>,
    ) -> Result<Self, RelinkError> {
        Self::builder()
            .target_prefix(target_prefix)
            .target_extension(target_extension)
            .build()
    }

    /// The prefix as used for joining and for the idempotence check.
    ///
    /// Blank falls back to [`DEFAULT_PREFIX`], trailing `/` and `\` are
    /// dropped, and a prefix made only of separators becomes the root `/`.
    pub fn normalised_prefix(&self) -> &str {
        let trimmed = self.target_prefix.trim();
        if trimmed.is_empty() {
            return DEFAULT_PREFIX;
        }
        let stripped = trimmed.trim_end_matches(['/', '\\']);
        if stripped.is_empty() {
            "/"
        } else {
            stripped
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn target_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim();
        self.config.target_prefix = if trimmed.is_empty() {
            DEFAULT_PREFIX.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    /// Accepts `webp`, `.webp` or an empty string.
    pub fn target_extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        let trimmed = ext.trim();
        self.config.target_extension = trimmed.strip_prefix('.').unwrap_or(trimmed).to_string();
        self
    }

    pub fn html_images(mut self, v: bool) -> Self {
        self.config.html_images = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, RelinkError> {
        let c = &self.config;
        if c.target_prefix.contains(['\n', '\r']) {
            return Err(RelinkError::InvalidConfig(
                "Target prefix must be a single line".into(),
            ));
        }
        check_prefix(&c.target_prefix)?;
        let ext = &c.target_extension;
        if !ext.is_empty() {
            if ext.contains(['/', '\\']) || ext.chars().any(char::is_whitespace) {
                return Err(RelinkError::InvalidConfig(format!(
                    "Target extension must be a bare extension such as 'webp', got '{ext}'"
                )));
            }
            if ext.chars().all(|ch| ch == '.') {
                return Err(RelinkError::InvalidConfig(format!(
                    "Target extension '.{ext}' has no name"
                )));
            }
        }
        Ok(self.config)
    }
}

/// The prefix is spliced verbatim into `![..](dest)` and `src="..."`, so it
/// must not contain anything that would end either early.
fn check_prefix(prefix: &str) -> Result<(), RelinkError> {
    if let Some(bad) = prefix
        .chars()
        .find(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '<' | '>' | '"' | '\'' | '`'))
    {
        return Err(RelinkError::InvalidConfig(format!(
            "Target prefix '{prefix}' contains {bad:?}, which cannot appear in an image path"
        )));
    }

    let mut depth = 0usize;
    for ch in prefix.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => {
                return Err(RelinkError::InvalidConfig(format!(
                    "Target prefix '{prefix}' has an unbalanced ')'"
                )));
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RelinkError::InvalidConfig(format!(
            "Target prefix '{prefix}' has an unbalanced '('"
        )));
    }
    Ok(())
}
