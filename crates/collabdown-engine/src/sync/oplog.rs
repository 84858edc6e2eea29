use crate::sync::{Operation, ParticipantId, Position, SendError};

/// Document state handed out when a participant connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialState {
    pub content: String,
    /// Number of operations the log has sequenced so far
    pub version: u64,
}

/// Something the operation log delivers to a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    Operation {
        op: Operation,
        origin: ParticipantId,
    },
    CursorMoved {
        participant: ParticipantId,
        position: Position,
    },
    ParticipantJoined(ParticipantId),
    ParticipantLeft(ParticipantId),
}

/// The networked operation log.
///
/// Delivers every operation to every participant in one total order; that
/// ordering is what makes participants converge.
pub trait OperationLog {
    /// The participant this endpoint speaks for
    fn participant(&self) -> &ParticipantId;

    fn fetch_initial(&mut self) -> Result<InitialState, SendError>;

    fn send(&mut self, op: &Operation) -> Result<(), SendError>;

    fn broadcast_cursor(&mut self, position: Position) -> Result<(), SendError>;

    /// Events delivered since the last call, in delivery order
    fn poll_events(&mut self) -> Vec<RemoteEvent>;
}
