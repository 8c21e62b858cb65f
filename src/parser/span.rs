use std::fmt;

/// Represents a location in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Location at the start of a file
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }

    /// Create a span from this location to another
    pub fn to(&self, end: Location) -> Span {
        Span::new(*self, end)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Represents a span of source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start location (inclusive)
    pub start: Location,
    /// End location (exclusive)
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Create a span from a single location
    pub fn single(location: Location) -> Self {
        Self { start: location, end: location }
    }

    /// Extend the span to include another span
    pub fn extend(&mut self, other: Span) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }

    /// Span covering both operands
    pub fn merge(self, other: Span) -> Span {
        let mut s = self;
        s.extend(other);
        s
    }

    pub fn line(&self) -> usize {
        self.start.line
    }

    /// Get the source text for this span
    pub fn source_text<'a>(&self, source: &'a str) -> &'a str {
        if self.start.offset >= source.len() {
            return "";
        }
        let end_offset = self.end.offset.min(source.len());
        &source[self.start.offset..end_offset]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            if self.start.column == self.end.column {
                write!(f, "{}:{}", self.start.line, self.start.column)
            } else {
                write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
            }
        } else {
            write!(f, "{}:{}-{}:{}", self.start.line, self.start.column, self.end.line, self.end.column)
        }
    }
}

/// Trait for types that carry a source span
pub trait HasSpan {
    fn span(&self) -> Span;
}

/// Maps byte offsets back to line/column pairs
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn location(&self, source: &str, offset: usize) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(l) => l,
            Err(l) => l - 1,
        };
        let start = self.line_starts[line];
        let column = source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start)
            + 1;
        Location::new(line + 1, column, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_maps_offsets() {
        let src = "ab\ncd\n\nef";
        let idx = LineIndex::new(src);
        assert_eq!(idx.location(src, 0), Location::new(1, 1, 0));
        assert_eq!(idx.location(src, 4), Location::new(2, 2, 4));
        assert_eq!(idx.location(src, 7), Location::new(4, 1, 7));
    }

    #[test]
    fn test_span_display_and_merge() {
        let a = Span::single(Location::new(1, 3, 2));
        let b = Span::single(Location::new(1, 9, 8));
        assert_eq!(a.merge(b).to_string(), "1:3-9");
    }
}
