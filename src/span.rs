//! Byte-offset source spans
//!
//! Every token, AST node, and diagnostic carries a `Span` of byte offsets into
//! the original source text. Line/column numbers are derived on demand with a
//! linear scan; nothing in the pipeline stores them eagerly.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Zero-length span at one offset, used for synthesized tokens.
    pub fn at(pos: u32) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end.max(self.start + 1)
    }
}

/// 1-indexed line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// Translate a byte offset to line/column with a single linear scan.
///
/// Offsets past the end of the text clamp to the final position. Columns count
/// bytes, not grapheme clusters; editors consuming the diagnostics expect the
/// same convention.
pub fn line_col_of(source: &str, offset: u32) -> LineCol {
    let offset = (offset as usize).min(source.len());
    let mut line = 1usize;
    let mut col = 1usize;
    for b in source.as_bytes()[..offset].iter() {
        if *b == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    LineCol { line, column: col }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_join() {
        let a = Span::new(3, 7);
        let b = Span::new(5, 12);
        assert_eq!(a.join(b), Span::new(3, 12));
    }

    #[test]
    fn test_line_col_first_line() {
        let lc = line_col_of("hello", 3);
        assert_eq!(lc, LineCol { line: 1, column: 4 });
    }

    #[test]
    fn test_line_col_after_newlines() {
        let src = "a\nbb\nccc";
        let lc = line_col_of(src, 5);
        assert_eq!(lc, LineCol { line: 3, column: 1 });
    }

    #[test]
    fn test_line_col_clamps_past_end() {
        let lc = line_col_of("ab", 99);
        assert_eq!(lc, LineCol { line: 1, column: 3 });
    }
}
