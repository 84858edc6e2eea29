use serde::{Deserialize, Serialize};

use crate::sync::TranslationError;

/// A (row, column) location in a line-oriented view of the document.
///
/// Both fields are zero-based; `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Start of the document
    pub const fn origin() -> Self {
        Self { row: 0, column: 0 }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Half-open range between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `at`
    pub const fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }
}

/// Immutable line view of the document at one instant.
///
/// Obtained from the editor widget and never cached across an edit: every
/// offset resolved against a snapshot is only meaningful for that snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    lines: Vec<String>,
    line_lens: Vec<usize>,
}

impl Snapshot {
    /// Split `text` on `'\n'`. A trailing newline yields a final empty line.
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
        let line_lens = lines.iter().map(|line| line.chars().count()).collect();
        Self { lines, line_lens }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Always at least one, even for an empty document
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_len(&self, row: usize) -> Option<usize> {
        self.line_lens.get(row).copied()
    }

    /// Total length in characters, newlines included
    pub fn len_chars(&self) -> usize {
        self.line_lens.iter().sum::<usize>() + self.line_lens.len().saturating_sub(1)
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn offset_to_position(&self, offset: usize) -> Result<Position, TranslationError> {
        offset_to_position(self, offset)
    }

    pub fn position_to_offset(&self, position: Position) -> Result<usize, TranslationError> {
        position_to_offset(self, position)
    }
}

/// Convert a character offset into a (row, column) position.
///
/// Walks the lines from the top, consuming `len + 1` per line, and stops at
/// the first line whose length is at least the remaining offset. An offset
/// equal to a line's length is the end of that line, not the start of the
/// next one.
pub fn offset_to_position(snapshot: &Snapshot, offset: usize) -> Result<Position, TranslationError> {
    let mut remaining = offset;
    for (row, &len) in snapshot.line_lens.iter().enumerate() {
        if remaining <= len {
            return Ok(Position::new(row, remaining));
        }
        remaining -= len + 1;
    }

    Err(TranslationError::OffsetOutOfBounds {
        offset,
        len: snapshot.len_chars(),
    })
}

/// Convert a (row, column) position into a character offset.
pub fn position_to_offset(snapshot: &Snapshot, position: Position) -> Result<usize, TranslationError> {
    let Some(&len) = snapshot.line_lens.get(position.row) else {
        return Err(TranslationError::RowOutOfBounds {
            row: position.row,
            rows: snapshot.line_count(),
        });
    };
    if position.column > len {
        return Err(TranslationError::ColumnOutOfBounds {
            row: position.row,
            column: position.column,
            len,
        });
    }

    let before: usize = snapshot.line_lens[..position.row]
        .iter()
        .map(|len| len + 1)
        .sum();
    Ok(before + position.column)
}

/// Byte index of the `chars`-th character of `text`, or `None` past the end.
pub(crate) fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    match text.char_indices().nth(chars) {
        Some((byte, _)) => Some(byte),
        None if text.chars().count() == chars => Some(text.len()),
        None => None,
    }
}
