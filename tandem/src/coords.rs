//! Coordinate translation between host and engine addressing.
//!
//! The host addresses text by character offset, or by 0-based `(row, column)` with the
//! column counted in characters. The engine addresses text by 1-based `(line, col)` with
//! the column counted in UTF-8 bytes. [`Snapshot`] is the only place where one is turned
//! into the other, so every conversion is a pure function of a single text snapshot.
//!
//! For any position that sits on a character boundary the round trip is exact:
//!
//! ```
//! use tandem::coords::{Point, Snapshot};
//!
//! let snapshot = Snapshot::new("naïve\ncafé au lait");
//! let point = Point::new(1, 4);
//! assert_eq!(snapshot.to_host_point(snapshot.to_engine_point(point)), point);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A host position: 0-based row, column in characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// An engine position: 1-based line, 1-based column in UTF-8 bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EnginePoint {
    pub line: u32,
    pub col: u32,
}

impl EnginePoint {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Byte length of the first `char_col` characters of `line`, clamped to the line end.
pub fn byte_col(line: &str, char_col: usize) -> usize {
    line.char_indices()
        .nth(char_col)
        .map_or(line.len(), |(index, _)| index)
}

/// Number of characters that fit entirely in the first `byte_col` bytes of `line`.
///
/// A byte column that lands inside a multi-byte character rounds down to the start of
/// that character. Columns past the end clamp to the character count.
pub fn char_col(line: &str, byte_col: usize) -> usize {
    line.char_indices()
        .take_while(|(index, ch)| index + ch.len_utf8() <= byte_col)
        .count()
}

/// Immutable view of a document's text with a line index.
///
/// Built once per synchronization pass from the host's current content. Offsets are
/// character offsets, matching the host's selection model.
#[derive(Debug, Clone)]
pub struct Snapshot {
    text: String,
    /// Byte offset of every line start.
    line_bytes: Vec<usize>,
    /// Character offset of every line start.
    line_chars: Vec<usize>,
    len: usize,
}

impl Snapshot {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_bytes = vec![0];
        let mut line_chars = vec![0];
        let mut len = 0;
        for (index, ch) in text.char_indices() {
            len += 1;
            if ch == '\n' {
                line_bytes.push(index + 1);
                line_chars.push(len);
            }
        }
        Self {
            text,
            line_bytes,
            line_chars,
            len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Document length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of lines. An empty document, and a trailing newline, both count a line.
    pub fn line_count(&self) -> u32 {
        self.line_bytes.len() as u32
    }

    fn clamp_row(&self, row: u32) -> usize {
        (row as usize).min(self.line_bytes.len() - 1)
    }

    /// Text of `row` without its newline. Rows past the end clamp to the last line.
    pub fn line(&self, row: u32) -> &str {
        let row = self.clamp_row(row);
        let start = self.line_bytes[row];
        let end = match self.line_bytes.get(row + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        &self.text[start..end]
    }

    /// Length of `row` in characters, excluding the newline.
    pub fn line_len(&self, row: u32) -> u32 {
        let range = self.line_range(row);
        (range.end - range.start) as u32
    }

    /// Character range of `row`, excluding the newline.
    pub fn line_range(&self, row: u32) -> Range<usize> {
        let row = self.clamp_row(row);
        let start = self.line_chars[row];
        let end = match self.line_chars.get(row + 1) {
            Some(next) => next - 1,
            None => self.len,
        };
        start..end
    }

    /// Character range of the line containing `offset`.
    pub fn line_range_at(&self, offset: usize) -> Range<usize> {
        self.line_range(self.offset_to_point(offset).row)
    }

    /// Offset of `point`; the column is clamped to the end of its row.
    pub fn point_to_offset(&self, point: Point) -> usize {
        let range = self.line_range(point.row);
        (range.start + point.column as usize).min(range.end)
    }

    /// Row and character column of `offset`, clamped to the document end.
    pub fn offset_to_point(&self, offset: usize) -> Point {
        let offset = offset.min(self.len);
        let row = self.line_chars.partition_point(|&start| start <= offset) - 1;
        Point::new(row as u32, (offset - self.line_chars[row]) as u32)
    }

    /// Byte index into [`Snapshot::text`] for a character offset.
    pub fn char_to_byte(&self, offset: usize) -> usize {
        let point = self.offset_to_point(offset);
        let row = point.row as usize;
        self.line_bytes[row] + byte_col(self.line(point.row), point.column as usize)
    }

    /// Re-encode a character column as the engine's 1-based byte column.
    pub fn to_engine_point(&self, point: Point) -> EnginePoint {
        let row = self.clamp_row(point.row) as u32;
        let col = byte_col(self.line(row), point.column as usize);
        EnginePoint::new(row + 1, col as u32 + 1)
    }

    /// Decode the engine's 1-based byte column back into a character column.
    pub fn to_host_point(&self, point: EnginePoint) -> Point {
        let row = self.clamp_row(point.line.saturating_sub(1)) as u32;
        let col = char_col(self.line(row), point.col.saturating_sub(1) as usize);
        Point::new(row, col as u32)
    }

    pub fn offset_to_engine(&self, offset: usize) -> EnginePoint {
        self.to_engine_point(self.offset_to_point(offset))
    }

    pub fn engine_to_offset(&self, point: EnginePoint) -> usize {
        self.point_to_offset(self.to_host_point(point))
    }
}
