//! Pre-dispatch sequencer.
//!
//! Runs at the top of every executor iteration. Its sole current duty is
//! moving arrived remote responses back into the ready queues; it never
//! reorders tasks already queued. (The intent is for this step to grow into
//! a priority resequencer; that change is confined to this module and the
//! executor's preamble.)

use super::TaskBoard;
use crate::task::Resume;
use tracing::{trace, warn};

/// Drains every inbound remote record.
///
/// A blocking record carries its suspended caller: the response is attached
/// as the caller's pending resume value and the caller returns to the ready
/// queue of its class (home secondary queue preserved). Non-blocking
/// records are simply dropped, since their caller was reinserted at send
/// time.
pub(crate) fn drain_responses(board: &TaskBoard) {
    for mut record in board.messages().drain_inbound() {
        if !record.is_blocking() {
            continue;
        }
        if let Some(mut caller) = record.take_caller() {
            let response = record.take_response();
            trace!(caller = %caller.id(), message = record.message(), "remote response delivered");
            caller.set_pending(Resume::Response(response));
            board.place(*caller);
        } else {
            warn!(message = record.message(), "blocking remote response had no caller attached");
        }
    }
}
