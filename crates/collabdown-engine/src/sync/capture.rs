use crate::sync::{ChangeEvent, Operation, Snapshot, TranslationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// A remote operation is being replayed; widget changes are not ours to send
    Suppressed,
}

/// Turns widget change events into outbound operations.
///
/// The start offset of a change is resolved against the snapshot taken after
/// the widget applied it. Only lines above `range.start.row` and the prefix of
/// that row contribute to the offset, and neither is touched by an insertion
/// or a removal starting there, so the post-change snapshot gives the same
/// offset the pre-change one would. `range.end` is never resolved: after a
/// removal it can lie past the end of the document.
#[derive(Debug, Default)]
pub struct LocalCapture {
    state: CaptureState,
}

impl LocalCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_suppressed(&self) -> bool {
        self.state == CaptureState::Suppressed
    }

    /// Classify `change` into an operation, or `None` while suppressed or
    /// when nothing changed.
    pub fn capture(
        &self,
        snapshot: &Snapshot,
        change: &ChangeEvent,
    ) -> Result<Option<Operation>, TranslationError> {
        if self.is_suppressed() {
            log::debug!("Suppressed echo of {:?}", change.action);
            return Ok(None);
        }

        let text = change.text();
        if text.is_empty() {
            return Ok(None);
        }

        let offset = snapshot.position_to_offset(change.range.start)?;
        let op = if change.is_insert() {
            Operation::Insert { offset, text }
        } else {
            Operation::Delete {
                offset,
                length: text.chars().count(),
            }
        };
        Ok(Some(op))
    }

    /// Run `f` with capture suppressed, restoring the previous state afterwards.
    ///
    /// `f` must finish the widget mutation synchronously; nothing else may be
    /// handled until it returns.
    pub fn suppressed<T>(&mut self, f: impl FnOnce(&Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.state, CaptureState::Suppressed);
        let result = f(self);
        self.state = previous;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{EditorWidget, Position, RopeEditor};
    use pretty_assertions::assert_eq;

    fn capture_change(
        editor: &mut RopeEditor,
        edit: impl FnOnce(&mut RopeEditor) -> ChangeEvent,
    ) -> Option<Operation> {
        let change = edit(editor);
        LocalCapture::new()
            .capture(&editor.snapshot(), &change)
            .unwrap()
    }

    #[test]
    fn test_insert_text_becomes_insert() {
        let mut editor = RopeEditor::from_text("ab\ncd\n");

        let op = capture_change(&mut editor, |e| {
            e.insert_at(Position::new(1, 0), "X").unwrap()
        });

        assert_eq!(op, Some(Operation::insert(3, "X")));
    }

    #[test]
    fn test_insert_lines_keeps_trailing_newline() {
        let mut editor = RopeEditor::from_text("one\ntwo");

        let op = capture_change(&mut editor, |e| {
            e.insert_at(Position::new(1, 0), "a\nb\n").unwrap()
        });

        assert_eq!(op, Some(Operation::insert(4, "a\nb\n")));
    }

    #[test]
    fn test_remove_text_becomes_delete() {
        let mut editor = RopeEditor::from_text("hello world");

        let op = capture_change(&mut editor, |e| {
            e.remove_range(Position::new(0, 5), Position::new(0, 11))
                .unwrap()
        });

        assert_eq!(op, Some(Operation::delete(5, 6)));
    }

    #[test]
    fn test_remove_lines_counts_newlines() {
        let mut editor = RopeEditor::from_text("a\nbb\ncc\nd");

        let op = capture_change(&mut editor, |e| {
            e.remove_range(Position::new(1, 0), Position::new(3, 0))
                .unwrap()
        });

        assert_eq!(op, Some(Operation::delete(2, 6)));
    }

    #[test]
    fn test_start_offset_is_the_same_before_and_after_the_edit() {
        let cases: Vec<(&str, Box<dyn Fn(&mut RopeEditor) -> ChangeEvent>)> = vec![
            (
                "ab\ncd\nef",
                Box::new(|e: &mut RopeEditor| e.insert_at(Position::new(1, 1), "\nXY\n").unwrap()),
            ),
            (
                "ab\ncd\nef",
                Box::new(|e: &mut RopeEditor| {
                    e.remove_range(Position::new(0, 1), Position::new(2, 1))
                        .unwrap()
                }),
            ),
            (
                "ab\ncd\nef",
                Box::new(|e: &mut RopeEditor| {
                    e.remove_range(Position::new(1, 0), Position::new(2, 2))
                        .unwrap()
                }),
            ),
        ];

        for (text, edit) in cases {
            let mut editor = RopeEditor::from_text(text);
            let before = editor.snapshot();
            let change = edit(&mut editor);
            let after = editor.snapshot();

            let capture = LocalCapture::new();
            let from_before = capture.capture(&before, &change).unwrap();
            let from_after = capture.capture(&after, &change).unwrap();

            assert_eq!(from_before, from_after);
        }
    }

    #[test]
    fn test_removal_reaching_document_end_resolves_against_post_change_snapshot() {
        let mut editor = RopeEditor::from_text("ab\ncd\nef");

        let op = capture_change(&mut editor, |e| {
            e.remove_range(Position::new(1, 1), Position::new(2, 2))
                .unwrap()
        });

        // range.end (2, 2) no longer exists after the removal
        assert_eq!(editor.text(), "ab\nc");
        assert_eq!(op, Some(Operation::delete(4, 4)));
    }

    #[test]
    fn test_nothing_is_captured_while_suppressed() {
        let mut editor = RopeEditor::from_text("ab");
        let mut capture = LocalCapture::new();

        let op = capture.suppressed(|capture| {
            assert_eq!(capture.state(), CaptureState::Suppressed);
            let change = editor.insert_at(Position::new(0, 1), "X").unwrap();
            capture.capture(&editor.snapshot(), &change).unwrap()
        });

        assert_eq!(op, None);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_empty_insert_is_not_an_operation() {
        let mut editor = RopeEditor::from_text("ab");

        let op = capture_change(&mut editor, |e| {
            e.insert_at(Position::new(0, 1), "").unwrap()
        });

        assert_eq!(op, None);
    }
}
