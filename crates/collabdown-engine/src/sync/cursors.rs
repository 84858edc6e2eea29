use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sync::{
    EditorWidget, MarkerId, MarkerStyle, Operation, Origin, ParticipantId, Position, TextRange,
    TranslationError,
};

/// What happens to a cursor sitting exactly at an insertion offset.
///
/// Deletions ignore the bias: a cursor at the start of a deleted span never moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorBias {
    /// Stays in front of the inserted text
    #[default]
    Stay,
    /// Moves to the end of the inserted text
    Advance,
}

/// Colours handed out to participants, indexed by a hash of their id
const PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324",
    "#800000", "#469990",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorRecord {
    /// Last known character offset
    pub offset: usize,
    pub marker: MarkerId,
    pub style: MarkerStyle,
}

/// Tracks every remote participant's cursor and keeps it on the right
/// character while the document changes underneath it.
#[derive(Debug, Default)]
pub struct CursorReconciler {
    cursors: BTreeMap<ParticipantId, CursorRecord>,
    bias: CursorBias,
    /// Set by every text change, consumed by the next selection change
    text_changed: bool,
}

impl CursorReconciler {
    pub fn new(bias: CursorBias) -> Self {
        Self {
            bias,
            ..Self::default()
        }
    }

    pub fn bias(&self) -> CursorBias {
        self.bias
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&CursorRecord> {
        self.cursors.get(participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &CursorRecord)> {
        self.cursors.iter()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Place `participant`'s cursor at `position`, replacing any previous marker.
    pub fn set_cursor<E: EditorWidget + ?Sized>(
        &mut self,
        editor: &mut E,
        participant: &ParticipantId,
        position: Position,
    ) -> Result<(), TranslationError> {
        let offset = editor.snapshot().position_to_offset(position)?;

        let style = match self.cursors.get(participant) {
            Some(previous) => {
                editor.remove_marker(previous.marker);
                previous.style.clone()
            }
            None => cursor_style(participant),
        };
        let range = TextRange::new(position, Position::new(position.row, position.column + 1));
        let marker = editor.add_marker(range, style.clone());

        self.cursors.insert(
            participant.clone(),
            CursorRecord {
                offset,
                marker,
                style,
            },
        );
        Ok(())
    }

    pub fn set_cursor_at_offset<E: EditorWidget + ?Sized>(
        &mut self,
        editor: &mut E,
        participant: &ParticipantId,
        offset: usize,
    ) -> Result<(), TranslationError> {
        let position = editor.snapshot().offset_to_position(offset)?;
        self.set_cursor(editor, participant, position)
    }

    /// Forget `participant` and remove its marker. Returns false if unknown.
    pub fn participant_left<E: EditorWidget + ?Sized>(
        &mut self,
        editor: &mut E,
        participant: &ParticipantId,
    ) -> bool {
        match self.cursors.remove(participant) {
            Some(record) => {
                editor.remove_marker(record.marker);
                true
            }
            None => false,
        }
    }

    /// Move every cursor except the origin's that lies after `at` by `delta`,
    /// never moving one in front of `at`.
    ///
    /// Must be called after the edit has reached the widget.
    pub fn shift_cursors<E: EditorWidget + ?Sized>(
        &mut self,
        editor: &mut E,
        origin: &Origin,
        at: usize,
        delta: isize,
    ) -> Result<(), TranslationError> {
        let moved: Vec<(ParticipantId, usize)> = self
            .cursors
            .iter()
            .filter(|(id, _)| origin.participant() != Some(*id))
            .filter(|(_, record)| self.moves(record.offset, at, delta))
            .map(|(id, record)| {
                let shifted = (record.offset as isize + delta).max(at as isize) as usize;
                (id.clone(), shifted)
            })
            .collect();

        for (participant, offset) in moved {
            self.set_cursor_at_offset(editor, &participant, offset)?;
        }
        Ok(())
    }

    /// Bring all cursors up to date after `op` was applied to the widget.
    ///
    /// A remote author's cursor lands at the end of its insertion or at the
    /// start of its deletion; everybody else is shifted.
    pub fn reconcile<E: EditorWidget + ?Sized>(
        &mut self,
        editor: &mut E,
        origin: &Origin,
        op: &Operation,
    ) -> Result<(), TranslationError> {
        let delta = op.delta();
        if let Some(author) = origin.participant() {
            let landing = op.offset() + delta.max(0) as usize;
            self.set_cursor_at_offset(editor, author, landing)?;
        }
        self.shift_cursors(editor, origin, op.offset(), delta)
    }

    pub fn note_text_change(&mut self) {
        self.text_changed = true;
    }

    /// Whether a selection change should be broadcast. A selection change
    /// following a text change is its consequence and is swallowed once.
    pub fn take_broadcast(&mut self) -> bool {
        !std::mem::take(&mut self.text_changed)
    }

    /// Remove every marker and forget every participant
    pub fn clear<E: EditorWidget + ?Sized>(&mut self, editor: &mut E) {
        for (_, record) in std::mem::take(&mut self.cursors) {
            editor.remove_marker(record.marker);
        }
    }

    fn moves(&self, offset: usize, at: usize, delta: isize) -> bool {
        offset > at || (offset == at && delta > 0 && self.bias == CursorBias::Advance)
    }
}

/// Deterministic marker style for a participant
pub fn cursor_style(participant: &ParticipantId) -> MarkerStyle {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"\W").expect("Invalid class regex"));

    // FNV-1a, stable across runs and platforms
    let hash = participant
        .as_str()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
        });

    MarkerStyle {
        class: format!("cursor {}", non_word.replace_all(participant.as_str(), "-")),
        color: PALETTE[(hash % PALETTE.len() as u64) as usize].to_string(),
    }
}
