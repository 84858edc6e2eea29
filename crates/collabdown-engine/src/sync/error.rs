use thiserror::Error;

use crate::sync::{Operation, ParticipantId};

/// An offset or position does not exist in the snapshot it was resolved against.
///
/// Never clamped: a failed translation usually means the caller is holding a
/// stale offset or snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("offset {offset} is past the end of the document (length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("row {row} is outside the document ({rows} lines)")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("column {column} is past the end of row {row} (length {len})")]
    ColumnOutOfBounds { row: usize, column: usize, len: usize },

    #[error("text inserted at offset {offset} contains a carriage return")]
    CarriageReturn { offset: usize },
}

/// The operation log could not accept an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("operation log is disconnected")]
    Disconnected,

    #[error("operation log rejected {op}: {reason}")]
    Rejected { op: Operation, reason: String },
}

/// A remote operation does not fit the local document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("remote {op} from {origin} does not fit the local document (length {len})")]
    Diverged {
        op: Operation,
        origin: ParticipantId,
        len: usize,
        #[source]
        source: TranslationError,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error("synchronization lost after {failures} consecutive apply failures")]
    SyncLost { failures: u32 },
}
