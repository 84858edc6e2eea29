use crate::preview::Renderer;
use crate::sync::{
    CaptureState, ChangeEvent, CursorBias, CursorReconciler, EditorWidget, LocalCapture,
    Operation, OperationLog, Origin, ParticipantId, Position, RemoteEvent, SyncError,
    apply::apply_remote,
};

/// Knobs for one synchronisation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub cursor_bias: CursorBias,
    /// Consecutive apply failures tolerated before the session is considered
    /// out of sync. Zero behaves like one.
    pub max_apply_failures: u32,
    /// Typed into the document when joining a log that has never seen an operation
    pub seed_text: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cursor_bias: CursorBias::default(),
            max_apply_failures: 3,
            seed_text: None,
        }
    }
}

impl SessionOptions {
    pub fn with_seed_text(mut self, seed_text: impl Into<String>) -> Self {
        self.seed_text = Some(seed_text.into());
        self
    }

    pub fn with_cursor_bias(mut self, cursor_bias: CursorBias) -> Self {
        self.cursor_bias = cursor_bias;
        self
    }

    pub fn with_max_apply_failures(mut self, max_apply_failures: u32) -> Self {
        self.max_apply_failures = max_apply_failures;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Synchronized,
    /// Remote operations keep failing to apply: the delivery order guarantee
    /// has been broken and this document can no longer be trusted
    SyncLost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub send_failures: u64,
    pub applied: u64,
    pub apply_failures: u64,
}

/// Outcome of draining the log once
#[derive(Debug, Default)]
pub struct PumpReport {
    pub handled: usize,
    pub failures: Vec<SyncError>,
}

/// One participant's view of a shared document.
///
/// Owns the editor widget and the operation log endpoint and is the single
/// handler for both: local changes go through [`SyncSession::handle_local_change`],
/// everything the log delivers through [`SyncSession::handle_remote`]. Every
/// handler runs to completion before the next one starts, which is what makes
/// the suppression window around remote replays sufficient.
pub struct SyncSession<E, L> {
    editor: E,
    log: L,
    capture: LocalCapture,
    cursors: CursorReconciler,
    options: SessionOptions,
    status: SessionStatus,
    consecutive_failures: u32,
    stats: SessionStats,
    renderer: Option<Box<dyn Renderer>>,
    preview_html: Option<String>,
}

impl<E: EditorWidget, L: OperationLog> SyncSession<E, L> {
    /// Connect `editor` to `log`.
    ///
    /// Loads the log's content into the widget without echoing it back. A log
    /// that has never sequenced an operation and holds no text is seeded with
    /// `options.seed_text`, which is sent like any local typing.
    pub fn start(editor: E, mut log: L, options: SessionOptions) -> Result<Self, SyncError> {
        let initial = log.fetch_initial()?;
        log::info!(
            "{} got version {} ({} chars)",
            log.participant(),
            initial.version,
            initial.content.chars().count()
        );

        let mut session = Self {
            editor,
            log,
            capture: LocalCapture::new(),
            cursors: CursorReconciler::new(options.cursor_bias),
            options,
            status: SessionStatus::Synchronized,
            consecutive_failures: 0,
            stats: SessionStats::default(),
            renderer: None,
            preview_html: None,
        };
        session.load(&initial.content)?;

        if initial.version == 0
            && initial.content.is_empty()
            && let Some(seed) = session.options.seed_text.clone()
        {
            session.insert_local(Position::origin(), &seed)?;
        }
        Ok(session)
    }

    /// Attach a live preview, rendered immediately and after every change
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self.refresh_preview();
        self
    }

    pub fn participant(&self) -> &ParticipantId {
        self.log.participant()
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn cursors(&self) -> &CursorReconciler {
        &self.cursors
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn preview_html(&self) -> Option<&str> {
        self.preview_html.as_deref()
    }

    pub fn text(&self) -> String {
        self.editor.snapshot().text()
    }

    /// Type `text` at `at` as the local user
    pub fn insert_local(&mut self, at: Position, text: &str) -> Result<Option<Operation>, SyncError> {
        let change = self.editor.insert_at(at, text)?;
        self.handle_local_change(&change)
    }

    /// Delete `start..end` as the local user
    pub fn remove_local(
        &mut self,
        start: Position,
        end: Position,
    ) -> Result<Option<Operation>, SyncError> {
        let change = self.editor.remove_range(start, end)?;
        self.handle_local_change(&change)
    }

    /// Handle a change event fired by the widget.
    ///
    /// Sends the resulting operation, if any. A failed send is logged and
    /// counted; the local edit stays applied.
    pub fn handle_local_change(
        &mut self,
        change: &ChangeEvent,
    ) -> Result<Option<Operation>, SyncError> {
        self.cursors.note_text_change();
        let op = self.capture.capture(&self.editor.snapshot(), change)?;

        if let Some(op) = &op {
            log::info!("{} sending {op}", self.log.participant());
            match self.log.send(op) {
                Ok(()) => self.stats.sent += 1,
                Err(e) => {
                    log::error!("{} failed to send {op}: {e}", self.log.participant());
                    self.stats.send_failures += 1;
                }
            }
            self.cursors.reconcile(&mut self.editor, &Origin::Local, op)?;
        }

        self.refresh_preview();
        Ok(op)
    }

    /// Handle one event delivered by the operation log
    pub fn handle_remote(&mut self, event: RemoteEvent) -> Result<(), SyncError> {
        match event {
            RemoteEvent::Operation { op, origin } => self.apply(op, origin),
            RemoteEvent::CursorMoved {
                participant,
                position,
            } => {
                if &participant == self.log.participant() {
                    return Ok(());
                }
                self.cursors
                    .set_cursor(&mut self.editor, &participant, position)
                    .map_err(|e| {
                        log::warn!("Stale cursor from {participant} at {position}: {e}");
                        e.into()
                    })
            }
            RemoteEvent::ParticipantJoined(participant) => {
                if &participant != self.log.participant() && self.cursors.get(&participant).is_none()
                {
                    self.cursors
                        .set_cursor(&mut self.editor, &participant, Position::origin())?;
                }
                Ok(())
            }
            RemoteEvent::ParticipantLeft(participant) => {
                self.cursors.participant_left(&mut self.editor, &participant);
                Ok(())
            }
        }
    }

    /// Handle a selection change in the widget; `lead` is the caret.
    ///
    /// Returns whether the position was broadcast. Selection changes caused by
    /// a text change are not, the operation already carries that information.
    pub fn handle_selection_change(&mut self, lead: Position) -> bool {
        if !self.cursors.take_broadcast() {
            return false;
        }
        match self.log.broadcast_cursor(lead) {
            Ok(()) => {
                log::debug!("{} broadcast cursor {lead}", self.log.participant());
                true
            }
            Err(e) => {
                log::error!("{} failed to broadcast cursor: {e}", self.log.participant());
                self.stats.send_failures += 1;
                false
            }
        }
    }

    /// Handle everything the log has delivered since the last pump
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        for event in self.log.poll_events() {
            report.handled += 1;
            if let Err(e) = self.handle_remote(event) {
                report.failures.push(e);
            }
        }
        report
    }

    /// End the session, removing every remote cursor from the widget
    pub fn teardown(mut self) -> (E, L) {
        self.cursors.clear(&mut self.editor);
        log::info!("{} session closed", self.log.participant());
        (self.editor, self.log)
    }

    fn apply(&mut self, op: Operation, origin: ParticipantId) -> Result<(), SyncError> {
        if &origin == self.log.participant() {
            log::debug!("Ignoring own {op} delivered back by the log");
            return Ok(());
        }
        log::info!("{} got {op} from {origin}", self.log.participant());

        match apply_remote(&mut self.editor, &mut self.capture, &op, &origin) {
            Ok(_) => {
                self.cursors.note_text_change();
                self.consecutive_failures = 0;
                self.stats.applied += 1;
                self.refresh_preview();
                self.cursors
                    .reconcile(&mut self.editor, &Origin::Remote(origin), &op)?;
                Ok(())
            }
            Err(e) => {
                log::error!("{} could not apply remote operation: {e}", self.log.participant());
                self.stats.apply_failures += 1;
                self.consecutive_failures += 1;

                if self.consecutive_failures >= self.options.max_apply_failures.max(1) {
                    if self.status != SessionStatus::SyncLost {
                        log::error!(
                            "{} lost synchronization after {} failed operations",
                            self.log.participant(),
                            self.consecutive_failures
                        );
                    }
                    self.status = SessionStatus::SyncLost;
                    return Err(SyncError::SyncLost {
                        failures: self.consecutive_failures,
                    });
                }
                Err(e.into())
            }
        }
    }

    /// Replace the widget's content without sending anything
    fn load(&mut self, content: &str) -> Result<(), SyncError> {
        let snapshot = self.editor.snapshot();
        if snapshot.text() == content {
            return Ok(());
        }

        let editor = &mut self.editor;
        self.capture.suppressed(|capture| -> Result<(), SyncError> {
            if snapshot.len_chars() > 0 {
                let end = snapshot.offset_to_position(snapshot.len_chars())?;
                let cleared = editor.remove_range(Position::origin(), end)?;
                capture.capture(&editor.snapshot(), &cleared)?;
            }
            let loaded = editor.insert_at(Position::origin(), content)?;
            capture.capture(&editor.snapshot(), &loaded)?;
            Ok(())
        })?;
        self.refresh_preview();
        Ok(())
    }

    fn refresh_preview(&mut self) {
        if let Some(renderer) = &self.renderer {
            self.preview_html = Some(renderer.render(&self.editor.snapshot().text()));
        }
    }
}
