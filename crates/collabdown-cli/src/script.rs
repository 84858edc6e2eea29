use anyhow::{Context, Result, bail};
use collabdown_engine::{EditorWidget, MarkdownPreview};
use collabdown_engine::sync::{
    LocalRelay, Operation, ParticipantId, Position, RelayEndpoint, RopeEditor, SessionOptions,
    SessionStats, SessionStatus, SyncSession,
};
use serde::Deserialize;

type Session = SyncSession<RopeEditor, RelayEndpoint>;

/// A scripted editing session, loaded from TOML
#[derive(Debug, Deserialize)]
pub struct Script {
    /// Join order; the first participant seeds the room
    pub participants: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        let script: Script = toml::from_str(content).context("Invalid script")?;
        if script.participants.is_empty() {
            bail!("Script names no participants");
        }
        Ok(script)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Insert {
        participant: String,
        at: Position,
        text: String,
    },
    Remove {
        participant: String,
        start: Position,
        end: Position,
    },
    Cursor {
        participant: String,
        at: Position,
    },
    /// Every connected participant handles what the relay has delivered
    Sync,
    Leave {
        participant: String,
    },
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub seed_text: String,
    pub session: SessionOptions,
    pub preview: bool,
}

#[derive(Debug)]
pub struct ParticipantReport {
    pub name: ParticipantId,
    pub text: String,
    pub cursors: Vec<(ParticipantId, Position)>,
    pub status: SessionStatus,
    pub stats: SessionStats,
}

#[derive(Debug)]
pub struct Report {
    /// Text as sequenced by the relay
    pub relay_text: String,
    /// Participants still connected at the end of the script
    pub participants: Vec<ParticipantReport>,
    pub preview: Option<String>,
    /// Events that failed to apply during syncs
    pub failures: usize,
}

impl Report {
    pub fn converged(&self) -> bool {
        self.diverged().is_empty()
    }

    /// Participants whose text differs from the relay's or who lost sync
    pub fn diverged(&self) -> Vec<&ParticipantId> {
        self.participants
            .iter()
            .filter(|p| p.text != self.relay_text || p.status != SessionStatus::Synchronized)
            .map(|p| &p.name)
            .collect()
    }
}

struct Seat {
    name: String,
    session: Option<Session>,
}

/// Every participant of a script, connected to one in-process relay
pub struct Room {
    relay: LocalRelay,
    seats: Vec<Seat>,
    failures: usize,
}

impl Room {
    pub fn open(participants: &[String], options: &ReplayOptions) -> Result<Self> {
        let relay = LocalRelay::new("");
        let mut seats = Vec::with_capacity(participants.len());

        for (index, name) in participants.iter().enumerate() {
            if seats.iter().any(|seat: &Seat| &seat.name == name) {
                bail!("Participant '{name}' is listed twice");
            }
            let mut session_options = options.session.clone();
            session_options.seed_text = (index == 0).then(|| options.seed_text.clone());

            let mut session = SyncSession::start(
                RopeEditor::new(),
                relay.join(name.as_str()),
                session_options,
            )
            .with_context(|| format!("Failed to connect {name}"))?;
            if options.preview {
                session = session.with_renderer(MarkdownPreview::new());
            }
            seats.push(Seat {
                name: name.clone(),
                session: Some(session),
            });
        }

        Ok(Self {
            relay,
            seats,
            failures: 0,
        })
    }

    pub fn run(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Insert {
                participant,
                at,
                text,
            } => {
                let session = self.session_mut(participant)?;
                let op = session.insert_local(*at, text)?;
                settle_caret(session, op.as_ref(), *at);
            }
            Step::Remove {
                participant,
                start,
                end,
            } => {
                let session = self.session_mut(participant)?;
                let op = session.remove_local(*start, *end)?;
                settle_caret(session, op.as_ref(), (*start).min(*end));
            }
            Step::Cursor { participant, at } => {
                let session = self.session_mut(participant)?;
                if !session.handle_selection_change(*at) {
                    log::warn!("Cursor of {participant} at {at} was not broadcast");
                }
            }
            Step::Sync => self.sync(),
            Step::Leave { participant } => {
                let seat = self.seat_mut(participant)?;
                let session = seat
                    .session
                    .take()
                    .with_context(|| format!("{participant} has already left"))?;
                let (_, endpoint) = session.teardown();
                endpoint.leave();
            }
        }
        Ok(())
    }

    /// Let every connected participant handle everything delivered so far
    pub fn sync(&mut self) {
        for seat in &mut self.seats {
            if let Some(session) = &mut seat.session {
                let report = session.pump();
                for failure in &report.failures {
                    log::warn!("{} failed to handle an event: {failure}", seat.name);
                }
                self.failures += report.failures.len();
            }
        }
    }

    /// Sync one last time and describe where everyone ended up
    pub fn finish(mut self) -> Report {
        self.sync();

        let mut participants = Vec::new();
        let mut preview = None;
        for seat in &self.seats {
            let Some(session) = &seat.session else {
                continue;
            };
            let snapshot = session.editor().snapshot();
            let cursors = session
                .cursors()
                .iter()
                .filter_map(|(id, record)| {
                    snapshot
                        .offset_to_position(record.offset)
                        .ok()
                        .map(|position| (id.clone(), position))
                })
                .collect();
            if preview.is_none() {
                preview = session.preview_html().map(str::to_string);
            }
            participants.push(ParticipantReport {
                name: session.participant().clone(),
                text: snapshot.text(),
                cursors,
                status: session.status(),
                stats: session.stats(),
            });
        }

        Report {
            relay_text: self.relay.text(),
            participants,
            preview,
            failures: self.failures,
        }
    }

    fn seat_mut(&mut self, participant: &str) -> Result<&mut Seat> {
        self.seats
            .iter_mut()
            .find(|seat| seat.name == participant)
            .with_context(|| format!("Unknown participant '{participant}'"))
    }

    fn session_mut(&mut self, participant: &str) -> Result<&mut Session> {
        self.seat_mut(participant)?
            .session
            .as_mut()
            .with_context(|| format!("{participant} has already left"))
    }
}

/// A widget moves its caret after every edit; replay that selection change
/// so it is swallowed the same way.
fn settle_caret(session: &mut Session, op: Option<&Operation>, fallback: Position) {
    let lead = op
        .and_then(|op| {
            let offset = op.offset() + op.delta().max(0) as usize;
            session.editor().snapshot().offset_to_position(offset).ok()
        })
        .unwrap_or(fallback);
    session.handle_selection_change(lead);
}

pub fn replay(script: &Script, options: &ReplayOptions) -> Result<Report> {
    let mut room = Room::open(&script.participants, options)?;
    for (index, step) in script.steps.iter().enumerate() {
        room.run(step)
            .with_context(|| format!("Step {} ({step:?}) failed", index + 1))?;
    }
    Ok(room.finish())
}
