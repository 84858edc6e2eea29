use crate::sync::{
    InitialState, Operation, OperationLog, ParticipantId, Position, RemoteEvent, SendError,
};

/// Operation log that records everything sent and delivers a hand-filled inbox
pub struct RecordingLog {
    participant: ParticipantId,
    content: String,
    version: u64,
    pub sent: Vec<Operation>,
    pub cursors: Vec<Position>,
    pub inbox: Vec<RemoteEvent>,
    /// Returned by every send while set
    pub fail_with: Option<SendError>,
}

impl RecordingLog {
    pub fn new(participant: &str, content: &str, version: u64) -> Self {
        Self {
            participant: participant.into(),
            content: content.to_string(),
            version,
            sent: Vec::new(),
            cursors: Vec::new(),
            inbox: Vec::new(),
            fail_with: None,
        }
    }
}

impl OperationLog for RecordingLog {
    fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    fn fetch_initial(&mut self) -> Result<InitialState, SendError> {
        Ok(InitialState {
            content: self.content.clone(),
            version: self.version,
        })
    }

    fn send(&mut self, op: &Operation) -> Result<(), SendError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        self.sent.push(op.clone());
        Ok(())
    }

    fn broadcast_cursor(&mut self, position: Position) -> Result<(), SendError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        self.cursors.push(position);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<RemoteEvent> {
        std::mem::take(&mut self.inbox)
    }
}
