/// In-memory view of a host document: a stable key plus its current text.
use serde::{Deserialize, Serialize};

/// Zero-based position; `column` is a byte offset within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Half-open range `[start, end)` over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering whole lines `first..=last`.
    ///
    /// The end column is left open-ended (`usize::MAX`) and clamped to the
    /// line length when the text is read.
    pub fn lines(first: usize, last: usize) -> Self {
        Self {
            start: Position::new(first, 0),
            end: Position::new(last, usize::MAX),
        }
    }

    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start.line && line <= self.end.line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    key: String,
    text: String,
}

impl Document {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Path-like identity used by the cache and the renderers.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> Vec<&str> {
        split_lines(&self.text)
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.text
            .split('\n')
            .nth(index)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    /// Exact text covered by `range`. Positions past the end of a line or of
    /// the document are clamped.
    pub fn text_in(&self, range: &TextRange) -> &str {
        let start = self.offset_of(range.start);
        let end = self.offset_of(range.end).max(start);
        &self.text[start..end]
    }

    fn offset_of(&self, pos: Position) -> usize {
        let mut offset = 0;
        for (index, raw) in self.text.split('\n').enumerate() {
            if index == pos.line {
                let line = raw.strip_suffix('\r').unwrap_or(raw);
                let mut column = pos.column.min(line.len());
                while !line.is_char_boundary(column) {
                    column -= 1;
                }
                return offset + column;
            }
            offset += raw.len() + 1;
        }
        self.text.len()
    }
}

/// Split on `\n`, dropping a trailing `\r` from each line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}
