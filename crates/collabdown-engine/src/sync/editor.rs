use std::collections::BTreeMap;

use xi_rope::{Rope, RopeInfo, delta::Builder};

use crate::sync::{Position, Snapshot, TextRange, TranslationError, position::byte_offset};

/// What a text-editing widget reports after mutating its document.
///
/// Insertions and deletions each come in a text form and a whole-lines form;
/// both normalise to a single operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    InsertText(String),
    InsertLines(Vec<String>),
    RemoveText(String),
    RemoveLines(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Affected range. For removals `end` is in pre-change coordinates.
    pub range: TextRange,
    pub action: ChangeAction,
}

impl ChangeEvent {
    pub fn is_insert(&self) -> bool {
        matches!(
            self.action,
            ChangeAction::InsertText(_) | ChangeAction::InsertLines(_)
        )
    }

    /// Inserted or removed text. Whole-line forms gain their trailing newline.
    pub fn text(&self) -> String {
        match &self.action {
            ChangeAction::InsertText(text) | ChangeAction::RemoveText(text) => text.clone(),
            ChangeAction::InsertLines(lines) | ChangeAction::RemoveLines(lines) => {
                let mut text = lines.join("\n");
                text.push('\n');
                text
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Visual style of a participant's cursor marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    /// CSS-style class list, e.g. `cursor alice-example-com`
    pub class: String,
    /// `#rrggbb`
    pub color: String,
}

/// The text-editing widget the core drives.
///
/// Mutations return the change event the widget fires for them so the caller
/// can route it through local edit capture before doing anything else.
pub trait EditorWidget {
    /// Current document. Must be re-fetched after every mutation.
    fn snapshot(&self) -> Snapshot;

    fn insert_at(&mut self, at: Position, text: &str) -> Result<ChangeEvent, TranslationError>;

    fn remove_range(
        &mut self,
        start: Position,
        end: Position,
    ) -> Result<ChangeEvent, TranslationError>;

    fn add_marker(&mut self, range: TextRange, style: MarkerStyle) -> MarkerId;

    /// Returns false when no such marker exists
    fn remove_marker(&mut self, id: MarkerId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub range: TextRange,
    pub style: MarkerStyle,
}

/// In-memory widget backed by an xi-rope buffer.
///
/// Runs in unix newline mode: `\r\n` and lone `\r` are stored as `\n`.
#[derive(Clone)]
pub struct RopeEditor {
    buffer: Rope,
    markers: BTreeMap<MarkerId, Marker>,
    next_marker: u64,
}

impl RopeEditor {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            buffer: Rope::from(normalize_newlines(text).as_str()),
            markers: BTreeMap::new(),
            next_marker: 0,
        }
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerId, &Marker)> {
        self.markers.iter()
    }

    fn byte_at(
        &self,
        text: &str,
        snapshot: &Snapshot,
        at: Position,
    ) -> Result<(usize, usize), TranslationError> {
        let offset = snapshot.position_to_offset(at)?;
        let byte = byte_offset(text, offset).ok_or(TranslationError::OffsetOutOfBounds {
            offset,
            len: snapshot.len_chars(),
        })?;
        Ok((offset, byte))
    }
}

impl Default for RopeEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RopeEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RopeEditor")
            .field("text", &self.buffer.to_string())
            .field("markers", &self.markers)
            .finish()
    }
}

impl EditorWidget for RopeEditor {
    fn snapshot(&self) -> Snapshot {
        Snapshot::from_text(&self.buffer.to_string())
    }

    fn insert_at(&mut self, at: Position, text: &str) -> Result<ChangeEvent, TranslationError> {
        let inserted = normalize_newlines(text);
        let current = self.buffer.to_string();
        let snapshot = Snapshot::from_text(&current);
        let (offset, byte) = self.byte_at(&current, &snapshot, at)?;

        let mut builder = Builder::<RopeInfo>::new(self.buffer.len());
        builder.replace(byte..byte, Rope::from(inserted.as_str()));
        self.buffer = builder.build().apply(&self.buffer);

        let end = self
            .snapshot()
            .offset_to_position(offset + inserted.chars().count())?;
        let action = match inserted.strip_suffix('\n') {
            Some(body) if at.column == 0 => {
                ChangeAction::InsertLines(body.split('\n').map(str::to_owned).collect())
            }
            _ => ChangeAction::InsertText(inserted),
        };

        Ok(ChangeEvent {
            range: TextRange::new(at, end),
            action,
        })
    }

    fn remove_range(
        &mut self,
        start: Position,
        end: Position,
    ) -> Result<ChangeEvent, TranslationError> {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let current = self.buffer.to_string();
        let snapshot = Snapshot::from_text(&current);
        let (_, start_byte) = self.byte_at(&current, &snapshot, start)?;
        let (_, end_byte) = self.byte_at(&current, &snapshot, end)?;

        let removed = current[start_byte..end_byte].to_owned();
        let mut builder = Builder::<RopeInfo>::new(self.buffer.len());
        builder.delete(start_byte..end_byte);
        self.buffer = builder.build().apply(&self.buffer);

        let whole_lines = start.column == 0 && end.column == 0 && end.row > start.row;
        let action = match removed.strip_suffix('\n') {
            Some(body) if whole_lines => {
                ChangeAction::RemoveLines(body.split('\n').map(str::to_owned).collect())
            }
            _ => ChangeAction::RemoveText(removed),
        };

        Ok(ChangeEvent {
            range: TextRange::new(start, end),
            action,
        })
    }

    fn add_marker(&mut self, range: TextRange, style: MarkerStyle) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(id, Marker { range, style });
        id
    }

    fn remove_marker(&mut self, id: MarkerId) -> bool {
        self.markers.remove(&id).is_some()
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_text_reports_range() {
        let mut editor = RopeEditor::from_text("ab\ncd\n");

        let change = editor.insert_at(Position::new(1, 0), "X").unwrap();

        assert_eq!(editor.text(), "ab\nXcd\n");
        assert_eq!(
            change,
            ChangeEvent {
                range: TextRange::new(Position::new(1, 0), Position::new(1, 1)),
                action: ChangeAction::InsertText("X".to_string()),
            }
        );
    }

    #[test]
    fn test_insert_whole_lines_uses_lines_form() {
        let mut editor = RopeEditor::from_text("ab\ncd");

        let change = editor.insert_at(Position::new(1, 0), "x\ny\n").unwrap();

        assert_eq!(editor.text(), "ab\nx\ny\ncd");
        assert_eq!(
            change.action,
            ChangeAction::InsertLines(vec!["x".to_string(), "y".to_string()])
        );
        assert_eq!(change.text(), "x\ny\n");
        assert_eq!(change.range.end, Position::new(3, 0));
    }

    #[test]
    fn test_insert_normalizes_windows_newlines() {
        let mut editor = RopeEditor::from_text("a\r\nb");
        assert_eq!(editor.text(), "a\nb");

        editor.insert_at(Position::new(0, 1), "1\r\n2").unwrap();
        assert_eq!(editor.text(), "a1\n2\nb");
    }

    #[test]
    fn test_insert_uses_character_columns() {
        let mut editor = RopeEditor::from_text("héllo");

        editor.insert_at(Position::new(0, 2), "_").unwrap();

        assert_eq!(editor.text(), "hé_llo");
    }

    #[test]
    fn test_insert_outside_document_is_rejected() {
        let mut editor = RopeEditor::from_text("ab");

        let result = editor.insert_at(Position::new(0, 5), "X");

        assert!(matches!(
            result,
            Err(TranslationError::ColumnOutOfBounds { .. })
        ));
        assert_eq!(editor.text(), "ab");
    }

    #[test]
    fn test_remove_text_within_line() {
        let mut editor = RopeEditor::from_text("hello world");

        let change = editor
            .remove_range(Position::new(0, 5), Position::new(0, 11))
            .unwrap();

        assert_eq!(editor.text(), "hello");
        assert_eq!(change.action, ChangeAction::RemoveText(" world".to_string()));
        assert!(!change.is_insert());
    }

    #[test]
    fn test_remove_whole_lines_uses_lines_form() {
        let mut editor = RopeEditor::from_text("a\nb\nc\nd");

        let change = editor
            .remove_range(Position::new(1, 0), Position::new(3, 0))
            .unwrap();

        assert_eq!(editor.text(), "a\nd");
        assert_eq!(
            change.action,
            ChangeAction::RemoveLines(vec!["b".to_string(), "c".to_string()])
        );
        assert_eq!(change.text(), "b\nc\n");
    }

    #[test]
    fn test_remove_accepts_reversed_range() {
        let mut editor = RopeEditor::from_text("abcdef");

        let change = editor
            .remove_range(Position::new(0, 4), Position::new(0, 1))
            .unwrap();

        assert_eq!(editor.text(), "aef");
        assert_eq!(change.range.start, Position::new(0, 1));
    }

    #[test]
    fn test_markers_are_added_and_removed() {
        let mut editor = RopeEditor::new();
        let style = MarkerStyle {
            class: "cursor bob".to_string(),
            color: "#e6194b".to_string(),
        };

        let id = editor.add_marker(TextRange::caret(Position::origin()), style.clone());

        assert_eq!(editor.marker(id).map(|m| &m.style), Some(&style));
        assert!(editor.remove_marker(id));
        assert!(!editor.remove_marker(id));
        assert_eq!(editor.markers().count(), 0);
    }
}
