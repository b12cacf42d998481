//! Source location tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A span in the query text, represented as a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of this span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub const fn merge(&self, other: &Self) -> Self {
        Self {
            start: if self.start < other.start { self.start } else { other.start },
            end: if self.end > other.end { self.end } else { other.end },
        }
    }

    /// Get the source text for this span.
    ///
    /// Returns an empty string if the span does not fall on character
    /// boundaries of `source`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    /// Convert to a byte range.
    #[must_use]
    pub const fn into_range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A value together with the span of query text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spanned<T> {
    /// The parsed value.
    pub value: T,
    /// Where the value was found.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Create a new spanned value.
    pub const fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    /// Map the inner value, keeping the span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }

    /// Get a reference to the inner value.
    pub const fn inner(&self) -> &T {
        &self.value
    }

    /// Unwrap into the inner value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// The query text this value was parsed from.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// A human-readable position in the query text.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based, in characters).
    pub column: usize,
    /// Byte offset from the start of the query.
    pub offset: usize,
}

impl Location {
    /// Compute the location of a byte offset within `source`.
    ///
    /// Offsets past the end of `source` are clamped to its length.
    #[must_use]
    pub fn of(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Self {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            offset,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_text() {
        let source = "SELECT account";
        let span = Span::new(7, 14);
        assert_eq!(span.text(source), "account");
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
        assert_eq!(span.into_range(), 7..14);
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(7, 11);
        let b = Span::new(14, 15);
        assert_eq!(a.merge(&b), Span::new(7, 15));
        assert_eq!(b.merge(&a), Span::new(7, 15));
        assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn test_spanned_map_keeps_span() {
        let source = "SELECT 42";
        let spanned = Spanned::new("42", Span::new(7, 9));
        assert_eq!(spanned.text(source), "42");
        let number = spanned.map(|s| s.parse::<i64>().unwrap());
        assert_eq!(number.span, Span::new(7, 9));
        assert_eq!(*number.inner(), 42);
        assert_eq!(number.to_string(), "42");
        assert_eq!(number.into_inner(), 42);
    }

    #[test]
    fn test_location_first_line() {
        let loc = Location::of("SELECT FROM", 7);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 8);
        assert_eq!(loc.offset, 7);
    }

    #[test]
    fn test_location_multiline() {
        let source = "SELECT a\n  FROM #\nWHERE x";
        let loc = Location::of(source, source.find("WHERE").unwrap());
        assert_eq!((loc.line, loc.column), (3, 1));
        let loc = Location::of(source, source.find('#').unwrap());
        assert_eq!((loc.line, loc.column), (2, 8));
    }

    #[test]
    fn test_location_counts_characters() {
        let source = "SELECT 'é' x";
        let loc = Location::of(source, source.find('x').unwrap());
        assert_eq!(loc.column, 12);
    }

    #[test]
    fn test_location_clamps_offset() {
        let loc = Location::of("abc", 10);
        assert_eq!(loc.offset, 3);
        assert_eq!(loc.column, 4);
    }
}
