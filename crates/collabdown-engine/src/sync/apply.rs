use crate::sync::{
    ApplyError, ChangeEvent, EditorWidget, LocalCapture, Operation, ParticipantId, TranslationError,
};

/// Replay a remote operation against the widget.
///
/// Offsets are resolved against the widget's current snapshot, then the
/// mutation runs with capture suppressed. The change event the widget fires
/// is routed through capture inside that window, so it can never turn into an
/// outbound operation. An operation that does not fit the local document is
/// reported as diverged and leaves the widget untouched. So is an insertion
/// carrying `\r`: the widget would store fewer characters than the operation
/// counts.
pub fn apply_remote<E: EditorWidget + ?Sized>(
    editor: &mut E,
    capture: &mut LocalCapture,
    op: &Operation,
    origin: &ParticipantId,
) -> Result<ChangeEvent, ApplyError> {
    let snapshot = editor.snapshot();
    let diverged = |source| ApplyError::Diverged {
        op: op.clone(),
        origin: origin.clone(),
        len: snapshot.len_chars(),
        source,
    };

    let replayed = match op {
        Operation::Insert { offset, text } => {
            let at = snapshot.offset_to_position(*offset).map_err(diverged)?;
            if text.contains('\r') {
                return Err(diverged(TranslationError::CarriageReturn { offset: *offset }));
            }
            capture.suppressed(|capture| -> Result<ChangeEvent, TranslationError> {
                let change = editor.insert_at(at, text)?;
                let echo = capture.capture(&editor.snapshot(), &change)?;
                debug_assert!(echo.is_none(), "captured {echo:?} while suppressed");
                Ok(change)
            })
        }
        Operation::Delete { offset, .. } => {
            let start = snapshot.offset_to_position(*offset).map_err(diverged)?;
            let end = snapshot
                .offset_to_position(op.end())
                .map_err(diverged)?;
            capture.suppressed(|capture| -> Result<ChangeEvent, TranslationError> {
                let change = editor.remove_range(start, end)?;
                let echo = capture.capture(&editor.snapshot(), &change)?;
                debug_assert!(echo.is_none(), "captured {echo:?} while suppressed");
                Ok(change)
            })
        }
    };

    replayed.map_err(diverged)
}
