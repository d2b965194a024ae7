//! Reference scanner: find image references in raw Markdown.
//!
//! A single left-to-right pass, line by line. Fenced code blocks are skipped
//! whole; inline code spans and backslash escapes are skipped within a line.
//! Two shapes are recognised:
//!
//! - `![alt](path "optional title")`, including `<...>` destinations and
//!   balanced parentheses inside the path
//! - `<img ... src="path" ...>` (when enabled)
//!
//! Anything that almost matches but is cut short (missing `]`, `)` or `>`,
//! stray text before the closing parenthesis, empty path) is plain text.
//! No construct spans a line break.

use super::fence::FenceTracker;
use crate::output::{ImageReference, ReferenceKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static RE_IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#).unwrap()
});

/// Scan `text` for image references.
///
/// The returned iterator is lazy and yields references in document order
/// with non-overlapping spans. Each call starts a fresh scan.
pub fn scan(text: &str, html_images: bool) -> References<'_> {
    References {
        text,
        html_images,
        fence: FenceTracker::new(),
        next_line: 0,
        line_no: 0,
        line: 0..0,
        cursor: 0,
    }
}

/// Iterator returned by [`scan`].
#[derive(Debug)]
pub struct References<'a> {
    text: &'a str,
    html_images: bool,
    fence: FenceTracker,
    /// Byte offset where the next unread line starts.
    next_line: usize,
    /// 1-indexed number of the current line.
    line_no: usize,
    /// Current line, without `\n` or a trailing `\r`.
    line: Range<usize>,
    cursor: usize,
}

impl Iterator for References<'_> {
    type Item = ImageReference;

    fn next(&mut self) -> Option<ImageReference> {
        loop {
            if self.cursor < self.line.end {
                if let Some(found) = self.scan_line() {
                    return Some(found);
                }
            }
            if !self.advance_line() {
                return None;
            }
        }
    }
}

impl References<'_> {
    /// Move to the next line that lies outside any fenced code block.
    fn advance_line(&mut self) -> bool {
        while self.next_line < self.text.len() {
            let start = self.next_line;
            let end = self.text[start..]
                .find('\n')
                .map_or(self.text.len(), |i| start + i);
            self.next_line = end + 1;
            self.line_no += 1;

            let content_end = if self.text[start..end].ends_with('\r') {
                end - 1
            } else {
                end
            };
            let line = &self.text[start..content_end];
            if self.fence.update(line) || self.fence.in_fence() {
                continue;
            }

            self.line = start..content_end;
            self.cursor = start;
            return true;
        }
        false
    }

    /// Continue scanning the current line from `cursor`.
    fn scan_line(&mut self) -> Option<ImageReference> {
        let bytes = self.text.as_bytes();
        let end = self.line.end;
        let mut i = self.cursor;

        while i < end {
            match bytes[i] {
                b'\\' => i += escape_len(bytes, i, end),
                b'`' => i = skip_code_span(bytes, i, end),
                b'!' if i + 1 < end && bytes[i + 1] == b'[' => {
                    if let Some(found) = self.markdown_image(i) {
                        self.cursor = found.span.end;
                        return Some(found);
                    }
                    i += 1;
                }
                b'<' if self.html_images => {
                    if let Some(found) = self.html_image(i) {
                        self.cursor = found.span.end;
                        return Some(found);
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        self.cursor = end;
        None
    }

    /// Parse `![alt](dest "title")` starting at the `!`.
    fn markdown_image(&self, start: usize) -> Option<ImageReference> {
        let bytes = self.text.as_bytes();
        let end = self.line.end;

        // Alt text, with nested brackets.
        let mut i = start + 2;
        let mut depth = 1usize;
        while i < end {
            match bytes[i] {
                b'\\' => {
                    i += escape_len(bytes, i, end);
                    continue;
                }
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if i >= end {
            return None;
        }
        i += 1;
        if i >= end || bytes[i] != b'(' {
            return None;
        }
        i = skip_blanks(bytes, i + 1, end);

        let (path_span, after) = if i < end && bytes[i] == b'<' {
            angle_destination(bytes, i, end)?
        } else {
            bare_destination(bytes, i, end)
        };
        if path_span.is_empty() {
            return None;
        }

        let mut i = skip_blanks(bytes, after, end);
        if i < end && matches!(bytes[i], b'"' | b'\'' | b'(') {
            i = skip_title(bytes, i, end)?;
            i = skip_blanks(bytes, i, end);
        }
        if i >= end || bytes[i] != b')' {
            return None;
        }

        Some(ImageReference {
            span: start..i + 1,
            path: self.text[path_span.clone()].to_string(),
            path_span,
            kind: ReferenceKind::Markdown,
            line: self.line_no,
        })
    }

    /// Parse `<img ... src=...>` starting at the `<`.
    fn html_image(&self, start: usize) -> Option<ImageReference> {
        let bytes = self.text.as_bytes();
        let end = self.line.end;

        if start + 4 >= end || !bytes[start..start + 4].eq_ignore_ascii_case(b"<img") {
            return None;
        }
        let next = bytes[start + 4];
        if !(next.is_ascii_whitespace() || next == b'/' || next == b'>') {
            return None;
        }

        let close = tag_end(bytes, start + 4, end)?;
        let tag = &self.text[start..=close];
        let caps = RE_IMG_SRC.captures(tag)?;
        let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        if value.as_str().is_empty() {
            return None;
        }

        Some(ImageReference {
            span: start..close + 1,
            path_span: start + value.start()..start + value.end(),
            path: value.as_str().to_string(),
            kind: ReferenceKind::Html,
            line: self.line_no,
        })
    }
}

/// Bytes consumed by a backslash at `i`: two for an escaped ASCII
/// punctuation character, otherwise just the backslash.
fn escape_len(bytes: &[u8], i: usize, end: usize) -> usize {
    if i + 1 < end && bytes[i + 1].is_ascii_punctuation() {
        2
    } else {
        1
    }
}

/// Offset of the `>` closing a tag, ignoring any inside quoted values.
///
/// A quote only opens a value right after `=`; stray apostrophes in
/// unquoted text are literal.
fn tag_end(bytes: &[u8], from: usize, end: usize) -> Option<usize> {
    let mut quote = None;
    let mut after_eq = false;
    for (j, &b) in bytes.iter().enumerate().take(end).skip(from) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' if after_eq => quote = Some(b),
            b'>' => return Some(j),
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            after_eq = b == b'=';
        }
    }
    None
}

fn skip_blanks(bytes: &[u8], mut i: usize, end: usize) -> usize {
    while i < end && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    i
}

/// Skip an inline code span opened by the backtick run at `i`.
///
/// The span closes at the next run of exactly the same length. An unmatched
/// run is literal, so only the run itself is skipped.
fn skip_code_span(bytes: &[u8], i: usize, end: usize) -> usize {
    let run = backtick_run(bytes, i, end);
    let mut j = i + run;
    while j < end {
        if bytes[j] == b'`' {
            let k = backtick_run(bytes, j, end);
            if k == run {
                return j + k;
            }
            j += k;
        } else {
            j += 1;
        }
    }
    i + run
}

fn backtick_run(bytes: &[u8], i: usize, end: usize) -> usize {
    bytes[i..end].iter().take_while(|&&b| b == b'`').count()
}

/// `<path with spaces.png>`: returns the inner span and the offset after `>`.
fn angle_destination(bytes: &[u8], open: usize, end: usize) -> Option<(Range<usize>, usize)> {
    let start = open + 1;
    let mut j = start;
    while j < end {
        match bytes[j] {
            b'\\' => {
                j += escape_len(bytes, j, end);
                continue;
            }
            b'>' => return Some((start..j, j + 1)),
            b'<' => return None,
            _ => {}
        }
        j += 1;
    }
    None
}

/// Bare destination: runs to the first unescaped blank or unbalanced `)`.
fn bare_destination(bytes: &[u8], start: usize, end: usize) -> (Range<usize>, usize) {
    let mut j = start;
    let mut parens = 0usize;
    while j < end {
        match bytes[j] {
            b'\\' => {
                j += escape_len(bytes, j, end);
                continue;
            }
            b' ' | b'\t' => break,
            b'(' => parens += 1,
            b')' => {
                if parens == 0 {
                    break;
                }
                parens -= 1;
            }
            c if c.is_ascii_control() => break,
            _ => {}
        }
        j += 1;
    }
    (start..j, j)
}

/// Skip a `"title"`, `'title'` or `(title)`; returns the offset after it.
fn skip_title(bytes: &[u8], open: usize, end: usize) -> Option<usize> {
    let close = match bytes[open] {
        b'(' => b')',
        quote => quote,
    };
    let mut j = open + 1;
    while j < end {
        if bytes[j] == b'\\' {
            j += escape_len(bytes, j, end);
            continue;
        }
        if bytes[j] == close {
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(text: &str) -> Vec<String> {
        scan(text, true).map(|r| r.path).collect()
    }

    #[test]
    fn basic_markdown_image() {
        let text = "Intro ![a cat](imgs/cat.png) outro";
        let refs: Vec<_> = scan(text, true).collect();
        assert_eq!(refs.len(), 1);
        let r = &refs[0];
        assert_eq!(r.path, "imgs/cat.png");
        assert_eq!(&text[r.path_span.clone()], "imgs/cat.png");
        assert_eq!(&text[r.span.clone()], "![a cat](imgs/cat.png)");
        assert_eq!(r.kind, ReferenceKind::Markdown);
        assert_eq!(r.line, 1);
    }

    #[test]
    fn title_is_not_part_of_path() {
        assert_eq!(paths(r#"![x](a.png "A title")"#), vec!["a.png"]);
        assert_eq!(paths("![x](a.png 'single')"), vec!["a.png"]);
        assert_eq!(paths("![x](a.png (paren))"), vec!["a.png"]);
        assert_eq!(paths("![x](  a.png  )"), vec!["a.png"]);
    }

    #[test]
    fn junk_after_path_is_not_an_image() {
        assert!(paths("![x](a.png junk)").is_empty());
        assert!(paths(r#"![x](a.png "open title)"#).is_empty());
    }

    #[test]
    fn angle_bracket_destination() {
        let text = "![x](<my photos/cat 1.png>)";
        let r = scan(text, true).next().unwrap();
        assert_eq!(r.path, "my photos/cat 1.png");
        assert_eq!(&text[r.span.clone()], text);
    }

    #[test]
    fn balanced_parens_in_path() {
        assert_eq!(paths("![x](img(1).png)"), vec!["img(1).png"]);
    }

    #[test]
    fn nested_brackets_in_alt() {
        assert_eq!(paths("![see [fig] 2](f.png)"), vec!["f.png"]);
    }

    #[test]
    fn plain_links_are_ignored() {
        assert!(paths("[not an image](doc.png)").is_empty());
        assert!(paths("![ref style][id]").is_empty());
    }

    #[test]
    fn linked_image_yields_image_only() {
        assert_eq!(paths("[![badge](b.svg)](https://ci.example.com)"), vec!["b.svg"]);
    }

    #[test]
    fn unterminated_constructs_yield_nothing() {
        assert!(paths("![alt").is_empty());
        assert!(paths("![alt](a.png").is_empty());
        assert!(paths("![alt](").is_empty());
        assert!(paths("<img src=\"a.png\"").is_empty());
        assert!(paths("trailing !").is_empty());
    }

    #[test]
    fn empty_destination_skipped() {
        assert!(paths("![x]()").is_empty());
        assert!(paths("![x](<>)").is_empty());
        assert!(paths("<img src=\"\">").is_empty());
    }

    #[test]
    fn escapes_disable_syntax() {
        assert!(paths(r"\![x](a.png)").is_empty());
        assert!(paths(r"!\[x](a.png)").is_empty());
        assert_eq!(paths(r"![x\]y](a.png)"), vec!["a.png"]);
    }

    #[test]
    fn fenced_code_skipped() {
        let text = "![a](1.png)\n```md\n![b](2.png)\n```\n~~~\n![c](3.png)\n~~~\n![d](4.png)\n";
        assert_eq!(paths(text), vec!["1.png", "4.png"]);
    }

    #[test]
    fn fence_nested_in_list_skipped() {
        let text = "- item\n  - nested\n\n    ```md\n    ![x](a.png)\n    ```\n\n![y](b.png)\n";
        assert_eq!(paths(text), vec!["b.png"]);
    }

    #[test]
    fn fence_in_blockquote_skipped() {
        let text = "> ```md\n> ![x](a.png)\n> ```\n> ![y](b.png)\n";
        assert_eq!(paths(text), vec!["b.png"]);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert_eq!(paths("![a](1.png)\n```\n![b](2.png)\n"), vec!["1.png"]);
    }

    #[test]
    fn inline_code_skipped() {
        let text = "Use `![x](no.png)` or ``![y](`no`.png)`` but ![z](yes.png)";
        assert_eq!(paths(text), vec!["yes.png"]);
    }

    #[test]
    fn unmatched_backtick_is_literal() {
        assert_eq!(paths("a ` b ![x](yes.png)"), vec!["yes.png"]);
    }

    #[test]
    fn html_img_tags() {
        let text = r#"<p><img width="10" src="pics/a.jpg" alt="a"></p><IMG SRC='b.gif'/> <img src=c.png>"#;
        let refs: Vec<_> = scan(text, true).collect();
        assert_eq!(refs.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), vec![
            "pics/a.jpg",
            "b.gif",
            "c.png"
        ]);
        assert!(refs.iter().all(|r| r.kind == ReferenceKind::Html));
        assert_eq!(&text[refs[0].path_span.clone()], "pics/a.jpg");
    }

    #[test]
    fn quoted_angle_bracket_does_not_end_tag() {
        let text = r#"<img alt="a>b" src="x.png"> <img title='1 > 0' src=y.png>"#;
        let refs: Vec<_> = scan(text, true).collect();
        assert_eq!(refs.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), vec!["x.png", "y.png"]);
        assert_eq!(&text[refs[0].span.clone()], r#"<img alt="a>b" src="x.png">"#);
    }

    #[test]
    fn bare_img_tag_has_no_path() {
        assert!(paths("<img>").is_empty());
        assert_eq!(paths("<img> ![x](a.png)"), vec!["a.png"]);
        assert_eq!(paths("<img alt=don't src=z.png>"), vec!["z.png"]);
    }

    #[test]
    fn data_src_attribute_is_not_src() {
        assert!(paths(r#"<img data-src="lazy.png">"#).is_empty());
    }

    #[test]
    fn html_disabled() {
        let text = r#"<img src="a.png"> ![b](b.png)"#;
        let got: Vec<_> = scan(text, false).map(|r| r.path).collect();
        assert_eq!(got, vec!["b.png"]);
    }

    #[test]
    fn other_tags_ignored() {
        assert!(paths(r#"<image src="x.png"> <iframe src="y.png">"#).is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let text = "![a](1.png)\r\n```\r\n![b](2.png)\r\n```\r\n![c](3.png)\r\n";
        let refs: Vec<_> = scan(text, true).collect();
        assert_eq!(refs.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), vec!["1.png", "3.png"]);
        assert_eq!(refs[1].line, 5);
    }

    #[test]
    fn constructs_do_not_span_lines() {
        assert!(paths("![alt\n](a.png)").is_empty());
        assert!(paths("![alt](a.png\n)").is_empty());
    }

    #[test]
    fn spans_ordered_and_disjoint() {
        let text = "![a](1.png)![b](2.png) <img src=\"3.png\">\n\n![c](4.png \"t\")";
        let refs: Vec<_> = scan(text, true).collect();
        assert_eq!(refs.len(), 4);
        for pair in refs.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
        assert_eq!(refs[3].line, 3);
    }

    #[test]
    fn non_ascii_text_around_images() {
        let text = "图片：![示例](图片/猫.png) 完";
        let r = scan(text, true).next().unwrap();
        assert_eq!(r.path, "图片/猫.png");
        assert_eq!(&text[r.path_span.clone()], "图片/猫.png");
    }
}
