use std::cmp;
use std::ops::Range;

use serde::Serialize;

/// A half-open byte range into source text: `start` inclusive, `end`
/// exclusive.
///
/// Spans travel with every node from the lexer to the lowerer; nothing in
/// the compiler tracks lines or columns, only byte offsets. Human-readable
/// positions are derived right before a diagnostic is printed, via
/// [`line_col`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span over `start..end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// A zero-length span at a given offset. Used for synthesized nodes.
    pub fn point(offset: u32) -> Self {
        Self { start: offset, end: offset }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The smallest span covering both `self` and `other`. The parser leans
    /// on this to grow a node's span from its first to its last token.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: cmp::min(self.start, other.start),
            end: cmp::max(self.end, other.end),
        }
    }

    /// The span as a `usize` range, the shape slicing and renderers want.
    pub fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Convert a byte offset into a 1-based (line, column) pair by scanning the
/// prefix once.
///
/// The compiler is fail-fast, so at most one diagnostic is ever positioned
/// per run; a single forward scan beats building a line-start index nothing
/// else would read. Columns count bytes from the last newline.
pub fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let cut = cmp::min(offset as usize, source.len());
    let prefix = &source.as_bytes()[..cut];
    let newlines = prefix.iter().filter(|&&b| b == b'\n').count() as u32;
    let col = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(last) => cut - last,
        None => cut + 1,
    };
    (newlines + 1, col as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both_spans() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
        // merge is symmetric
        assert_eq!(Span::new(8, 15).merge(Span::new(5, 10)), merged);
    }

    #[test]
    fn point_spans_are_empty() {
        let p = Span::point(7);
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
        assert_eq!(p.range(), 7..7);
    }

    #[test]
    fn line_col_on_the_first_line() {
        assert_eq!(line_col("hello", 0), (1, 1));
        assert_eq!(line_col("hello", 4), (1, 5));
    }

    #[test]
    fn line_col_after_newlines() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 3), (2, 1)); // 'c'
        assert_eq!(line_col(src, 7), (3, 2)); // 'f'
    }

    #[test]
    fn line_col_clamps_past_the_end() {
        assert_eq!(line_col("ab", 99), (1, 3));
    }
}
