use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use xi_rope::{Rope, RopeInfo, delta::Builder};

use crate::sync::{
    InitialState, Operation, OperationLog, ParticipantId, Position, RemoteEvent, SendError,
    TranslationError, position::byte_offset,
};

struct RelayState {
    /// Canonical text: every sequenced operation applied in order
    document: Rope,
    version: u64,
    inboxes: BTreeMap<ParticipantId, VecDeque<RemoteEvent>>,
    failing_sends: usize,
}

impl RelayState {
    fn deliver_to_others(&mut self, from: &ParticipantId, event: RemoteEvent) {
        for (participant, inbox) in self.inboxes.iter_mut() {
            if participant != from {
                inbox.push_back(event.clone());
            }
        }
    }
}

/// In-process operation log for a single-threaded host.
///
/// Sequences operations in arrival order and delivers them, in that order,
/// to every other participant. It does not transform concurrent operations.
#[derive(Clone)]
pub struct LocalRelay {
    state: Rc<RefCell<RelayState>>,
}

impl LocalRelay {
    pub fn new(content: &str) -> Self {
        Self {
            state: Rc::new(RefCell::new(RelayState {
                document: Rope::from(content),
                version: 0,
                inboxes: BTreeMap::new(),
                failing_sends: 0,
            })),
        }
    }

    /// Connect `participant`, announcing it to everyone already connected.
    ///
    /// Joining again under a connected id hands out another endpoint on the
    /// same inbox; nothing is announced and nothing queued is lost.
    pub fn join(&self, participant: impl Into<ParticipantId>) -> RelayEndpoint {
        let participant = participant.into();
        let mut state = self.state.borrow_mut();
        if state.inboxes.contains_key(&participant) {
            log::warn!("{participant} joined the relay twice, reusing its inbox");
            return RelayEndpoint {
                participant,
                state: Rc::clone(&self.state),
            };
        }
        state.deliver_to_others(
            &participant,
            RemoteEvent::ParticipantJoined(participant.clone()),
        );
        state.inboxes.insert(participant.clone(), VecDeque::new());
        log::info!("{participant} joined the relay");

        RelayEndpoint {
            participant,
            state: Rc::clone(&self.state),
        }
    }

    pub fn text(&self) -> String {
        self.state.borrow().document.to_string()
    }

    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.state.borrow().inboxes.keys().cloned().collect()
    }

    /// Make the next `count` sends from any participant fail
    pub fn fail_next_sends(&self, count: usize) {
        self.state.borrow_mut().failing_sends = count;
    }
}

/// One participant's connection to a [`LocalRelay`]
pub struct RelayEndpoint {
    participant: ParticipantId,
    state: Rc<RefCell<RelayState>>,
}

impl RelayEndpoint {
    /// Disconnect, announcing the departure to everyone else
    pub fn leave(&self) {
        let mut state = self.state.borrow_mut();
        if state.inboxes.remove(&self.participant).is_some() {
            state.deliver_to_others(
                &self.participant,
                RemoteEvent::ParticipantLeft(self.participant.clone()),
            );
            log::info!("{} left the relay", self.participant);
        }
    }

    fn connected(&self, state: &RelayState) -> Result<(), SendError> {
        if state.inboxes.contains_key(&self.participant) {
            Ok(())
        } else {
            Err(SendError::Disconnected)
        }
    }
}

impl OperationLog for RelayEndpoint {
    fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    fn fetch_initial(&mut self) -> Result<InitialState, SendError> {
        let state = self.state.borrow();
        self.connected(&state)?;
        Ok(InitialState {
            content: state.document.to_string(),
            version: state.version,
        })
    }

    fn send(&mut self, op: &Operation) -> Result<(), SendError> {
        let mut state = self.state.borrow_mut();
        self.connected(&state)?;
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(SendError::Disconnected);
        }

        let document =
            apply_to_rope(&state.document, op).map_err(|source| SendError::Rejected {
                op: op.clone(),
                reason: source.to_string(),
            })?;
        state.document = document;
        state.version += 1;
        state.deliver_to_others(
            &self.participant,
            RemoteEvent::Operation {
                op: op.clone(),
                origin: self.participant.clone(),
            },
        );
        Ok(())
    }

    fn broadcast_cursor(&mut self, position: Position) -> Result<(), SendError> {
        let mut state = self.state.borrow_mut();
        self.connected(&state)?;
        state.deliver_to_others(
            &self.participant,
            RemoteEvent::CursorMoved {
                participant: self.participant.clone(),
                position,
            },
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<RemoteEvent> {
        self.state
            .borrow_mut()
            .inboxes
            .get_mut(&self.participant)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }
}

fn apply_to_rope(document: &Rope, op: &Operation) -> Result<Rope, TranslationError> {
    let text = document.to_string();
    let len = text.chars().count();
    let byte = |offset: usize| {
        byte_offset(&text, offset).ok_or(TranslationError::OffsetOutOfBounds { offset, len })
    };

    let mut builder = Builder::<RopeInfo>::new(document.len());
    match op {
        Operation::Insert { offset, text } => {
            let at = byte(*offset)?;
            builder.replace(at..at, Rope::from(text.as_str()));
        }
        Operation::Delete { offset, .. } => {
            let start = byte(*offset)?;
            let end = byte(op.end())?;
            builder.delete(start..end);
        }
    }
    Ok(builder.build().apply(document))
}
