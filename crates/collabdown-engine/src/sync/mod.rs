/*!
 * # Text Synchronisation Core
 *
 * Keeps a line-oriented editor widget in step with a shared operation log so
 * several participants can edit one markdown document at the same time.
 *
 * ## Architecture Overview
 *
 * ### 1. Two coordinate systems
 * - The operation log speaks **character offsets** (`Insert{offset, text}`,
 *   `Delete{offset, length}`)
 * - The widget speaks **positions** (`row`, `column`)
 * - `position` converts between the two against a **Snapshot** of the widget;
 *   a snapshot is never reused once the document has changed
 *
 * ### 2. Local edits out
 * - Widget change events are classified by `capture` into operations and sent
 * - Text and whole-line forms of insert/remove collapse into two operation kinds
 *
 * ### 3. Remote edits in
 * - `apply` replays delivered operations against the widget
 * - Capture is **suppressed** for the duration of the replay, so a remote edit
 *   is never echoed back to the log
 *
 * ### 4. Cursors
 * - `cursors` keeps one marker per remote participant
 * - Every applied operation shifts cursors after the edit point and collapses
 *   cursors inside a deleted span onto its start
 * - The local caret is broadcast only on selection changes not caused by typing
 *
 * ### 5. Ordering
 * - Participants converge only if the log delivers operations in the same
 *   order everywhere; no transformation happens here
 * - All handlers run to completion on one thread, one at a time
 *
 * ## Module Structure
 *
 * - **`position`**: `Position`, `Snapshot` and the offset/position translator
 * - **`operation`**: `Operation`, `Origin` and `ParticipantId`
 * - **`editor`**: `EditorWidget` boundary and the xi-rope backed `RopeEditor`
 * - **`capture`**: local edit capture with its Idle/Suppressed state
 * - **`apply`**: remote operation replay
 * - **`cursors`**: remote cursor bookkeeping and broadcast gating
 * - **`oplog`**: `OperationLog` boundary and the events it delivers
 * - **`relay`**: in-process operation log for tests and local sessions
 * - **`session`**: `SyncSession`, the single owner of all of the above
 * - **`error`**: translation, send and apply failures
 *
 * ## Usage Pattern
 *
 * ```rust
 * use collabdown_engine::sync::*;
 *
 * let relay = LocalRelay::new("");
 * let mut alice = SyncSession::start(
 *     RopeEditor::new(),
 *     relay.join("alice"),
 *     SessionOptions::default().with_seed_text("# Notes\n"),
 * )
 * .unwrap();
 * let mut bob =
 *     SyncSession::start(RopeEditor::new(), relay.join("bob"), SessionOptions::default())
 *         .unwrap();
 *
 * bob.insert_local(Position::new(1, 0), "- milk\n").unwrap();
 * alice.pump();
 *
 * assert_eq!(alice.text(), "# Notes\n- milk\n");
 * assert_eq!(alice.text(), bob.text());
 * ```
 */

pub mod apply;
pub mod capture;
pub mod cursors;
pub mod editor;
pub mod error;
pub mod operation;
pub mod oplog;
pub mod position;
pub mod relay;
pub mod session;

// Public API re-exports
pub use capture::{CaptureState, LocalCapture};
pub use cursors::{CursorBias, CursorReconciler, CursorRecord, cursor_style};
pub use editor::{ChangeAction, ChangeEvent, EditorWidget, Marker, MarkerId, MarkerStyle, RopeEditor};
pub use error::{ApplyError, SendError, SyncError, TranslationError};
pub use operation::{Operation, Origin, ParticipantId};
pub use oplog::{InitialState, OperationLog, RemoteEvent};
pub use position::{Position, Snapshot, TextRange, offset_to_position, position_to_offset};
pub use relay::{LocalRelay, RelayEndpoint};
pub use session::{PumpReport, SessionOptions, SessionStats, SessionStatus, SyncSession};
