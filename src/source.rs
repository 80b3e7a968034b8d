//! Byte ranges and the offset-to-line/column source map.
//!
//! Every CST and AST node carries a half-open byte range into the original
//! source string. Ranges always index the original buffer: the scanner never
//! copies or normalises line endings, so offsets stay valid for the lifetime
//! of the source. The [`SourceMap`] turns an offset into a 1-indexed line and
//! column for diagnostics.

use std::fmt;

/// A half-open byte range `[start, end)` into the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A one-byte range at `pos`, used for point diagnostics such as a
    /// missing terminator just past the last consumed byte.
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A 1-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePos {
    pub line: usize,
    pub col: usize,
}

/// Maps byte offsets to line/column positions.
///
/// Built once per parse by recording the offset of each line start. Both
/// `\n` and `\r\n` terminate lines; a lone `\r` does not.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
    len: usize,
    has_cr: bool,
}

impl SourceMap {
    pub fn new(src: &str) -> Self {
        let mut line_starts = vec![0];
        let mut has_cr = false;
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            } else if b == b'\r' {
                has_cr = true;
            }
        }
        Self {
            line_starts,
            len: src.len(),
            has_cr,
        }
    }

    /// Whether any carriage return was observed in the source.
    pub fn has_cr(&self) -> bool {
        self.has_cr
    }

    /// Line/column of a byte offset. Offsets past the end of the source
    /// resolve past the last character rather than panicking, so point
    /// diagnostics at EOF stay addressable.
    pub fn line_pos(&self, offset: usize) -> LinePos {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = offset - self.line_starts[line_idx] + 1;
        LinePos {
            line: line_idx + 1,
            col,
        }
    }

    /// The text of a 1-indexed line, without its terminator.
    pub fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|s| s - 1)
            .unwrap_or(self.len)
            .min(src.len());
        let text = &src[start..end.max(start)];
        text.strip_suffix('\r').unwrap_or(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_pos_single_line() {
        let map = SourceMap::new("hello");
        assert_eq!(map.line_pos(0), LinePos { line: 1, col: 1 });
        assert_eq!(map.line_pos(4), LinePos { line: 1, col: 5 });
        assert_eq!(map.line_pos(5), LinePos { line: 1, col: 6 });
    }

    #[test]
    fn test_line_pos_multi_line() {
        let map = SourceMap::new("ab\ncd\nef");
        assert_eq!(map.line_pos(0), LinePos { line: 1, col: 1 });
        assert_eq!(map.line_pos(3), LinePos { line: 2, col: 1 });
        assert_eq!(map.line_pos(4), LinePos { line: 2, col: 2 });
        assert_eq!(map.line_pos(6), LinePos { line: 3, col: 1 });
    }

    #[test]
    fn test_crlf_detection() {
        assert!(!SourceMap::new("a\nb").has_cr());
        assert!(SourceMap::new("a\r\nb").has_cr());
        let map = SourceMap::new("ab\r\ncd");
        assert_eq!(map.line_pos(4), LinePos { line: 2, col: 1 });
    }

    #[test]
    fn test_line_text() {
        let src = "one\rtwo\r\nthree";
        let map = SourceMap::new(src);
        assert_eq!(map.line_text(src, 1), "one\rtwo");
        assert_eq!(map.line_text(src, 2), "three");
        assert_eq!(map.line_text(src, 3), "");
    }
}
