//! Fenced code block tracking for the reference scanner.

/// Tracks code fence state during line-by-line scanning.
///
/// Fences open with three or more backticks or tildes. Leading whitespace,
/// blockquote markers (`>`) and list bullets in front of the fence are
/// container syntax and are skipped, so fences nested in lists and quotes
/// are found too. The closing fence must use the same character and be at
/// least as long as the opening one, with only whitespace after it.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    fence_char: Option<u8>,
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Feed one line (without its line terminator).
    ///
    /// Returns `true` if the line opened or closed a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let body = strip_containers(line);

        if let Some(ch) = self.fence_char {
            if is_closing_fence(body, ch, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return true;
            }
            false
        } else if let Some((ch, len)) = detect_opening_fence(body) {
            self.fence_char = Some(ch);
            self.fence_len = len;
            true
        } else {
            false
        }
    }
}

/// Drop indentation, `>` quote markers and list markers in front of a line.
fn strip_containers(line: &str) -> &str {
    let mut rest = line.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix('>') {
            rest = after.trim_start();
        } else if let Some(after) = strip_list_marker(rest) {
            rest = after.trim_start();
        } else {
            return rest;
        }
    }
}

/// `- `, `* `, `+ `, `1. ` or `1) ` at the start of `s`.
fn strip_list_marker(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let marker_len = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.' | b')') if digits <= 9 => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    match bytes.get(marker_len) {
        Some(b' ' | b'\t') => Some(&s[marker_len..]),
        _ => None,
    }
}

fn run_length(body: &str, ch: u8) -> usize {
    body.bytes().take_while(|&b| b == ch).count()
}

fn detect_opening_fence(body: &str) -> Option<(u8, usize)> {
    let first = *body.as_bytes().first()?;
    if first != b'`' && first != b'~' {
        return None;
    }
    let len = run_length(body, first);
    if len < 3 {
        return None;
    }
    // ```foo``` on one line is inline code, not a fence
    if first == b'`' && body[len..].contains('`') {
        return None;
    }
    Some((first, len))
}

fn is_closing_fence(body: &str, ch: u8, min_len: usize) -> bool {
    let len = run_length(body, ch);
    len >= min_len && body[len..].chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_initially() {
        assert!(!FenceTracker::new().in_fence());
    }

    #[test]
    fn backtick_fence() {
        let mut t = FenceTracker::new();
        assert!(t.update("```rust"));
        assert!(t.in_fence());
        assert!(!t.update("![x](a.png)"));
        assert!(t.in_fence());
        assert!(t.update("```"));
        assert!(!t.in_fence());
    }

    #[test]
    fn tilde_fence_needs_matching_char() {
        let mut t = FenceTracker::new();
        assert!(t.update("~~~"));
        assert!(!t.update("```"));
        assert!(t.in_fence());
        assert!(t.update("~~~~"));
        assert!(!t.in_fence());
    }

    #[test]
    fn closing_fence_must_be_long_enough() {
        let mut t = FenceTracker::new();
        t.update("````md");
        assert!(!t.update("```"));
        assert!(t.in_fence());
        assert!(t.update("````"));
    }

    #[test]
    fn closing_fence_with_trailing_text_is_content() {
        let mut t = FenceTracker::new();
        t.update("```");
        assert!(!t.update("``` not a close"));
        assert!(t.in_fence());
    }

    #[test]
    fn indented_fences() {
        let mut t = FenceTracker::new();
        assert!(t.update("   ```"));
        assert!(t.update("```"));
        assert!(t.update("    ```md"));
        assert!(t.in_fence());
        assert!(t.update("\t```"));
        assert!(!t.in_fence());
    }

    #[test]
    fn fence_in_blockquote() {
        let mut t = FenceTracker::new();
        assert!(t.update("> ```md"));
        assert!(!t.update("> ![x](a.png)"));
        assert!(t.in_fence());
        assert!(t.update(">```"));
        assert!(!t.in_fence());
    }

    #[test]
    fn fence_in_nested_quote_and_list() {
        let mut t = FenceTracker::new();
        assert!(t.update("> > - ~~~"));
        assert!(t.in_fence());
        assert!(t.update(">>   ~~~"));
        assert!(!t.in_fence());
    }

    #[test]
    fn fence_opened_on_list_item_line() {
        let mut t = FenceTracker::new();
        assert!(t.update("1. ```sh"));
        assert!(t.in_fence());
        assert!(t.update("   ```"));
        assert!(!t.in_fence());
    }

    #[test]
    fn list_marker_needs_a_space() {
        let mut t = FenceTracker::new();
        assert!(!t.update("-```"));
        assert!(!t.update("1.```"));
        assert!(!t.in_fence());
    }

    #[test]
    fn inline_triple_backticks_are_not_a_fence() {
        let mut t = FenceTracker::new();
        assert!(!t.update("```let x = 1;``` and ![x](a.png)"));
        assert!(!t.in_fence());
    }
}
