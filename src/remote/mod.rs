//! Remote-task records and the transport-facing message board.
//!
//! A remote task is a request shipped to an external transport and answered
//! asynchronously. The board side of the protocol is two FIFOs under one
//! mutex: *outbound* (requests the transport consumes) and *inbound*
//! (responses the sequencer drains back into ready queues). One condition
//! variable, shared by both directions, is the transport's sleep point and
//! is broadcast at shutdown so the transport can observe termination.
//!
//! # Transport contract
//!
//! An adapter thread loops on [`TaskBoard::recv_outbound`], performs the
//! remote request described by [`RemoteTask::message`] and
//! [`RemoteTask::payload`], fills in the reply with [`RemoteTask::respond`],
//! and hands the record back through [`TaskBoard::send_inbound`]. A record
//! whose caller is blocked **must** come back (or be dropped only at
//! process end): the suspended caller travels inside the record and is
//! reinserted by the sequencer when the response arrives.
//!
//! [`TaskBoard::recv_outbound`]: crate::TaskBoard::recv_outbound
//! [`TaskBoard::send_inbound`]: crate::TaskBoard::send_inbound

use crate::config::MAX_MSG_LENGTH;
use crate::task::Task;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use tracing::trace;

/// Direction/status word of a remote-task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Outbound: created locally, awaiting the transport.
    Send,
    /// Inbound: the transport has attached a response.
    Recv,
}

/// A remote request, shipped to the transport and answered via the inbound
/// queue.
pub struct RemoteTask {
    status: RemoteStatus,
    message: String,
    payload: Vec<u8>,
    response: Option<Vec<u8>>,
    blocking: bool,
    /// The suspended calling task, owned by the record while out-of-process.
    /// Present iff `blocking`.
    pub(crate) caller: Option<Box<Task>>,
}

impl RemoteTask {
    /// Builds a record, truncating `message` to [`MAX_MSG_LENGTH`] bytes on
    /// a character boundary.
    pub(crate) fn new(message: &str, payload: Vec<u8>, blocking: bool) -> Self {
        Self {
            status: RemoteStatus::Send,
            message: truncate_message(message),
            payload,
            response: None,
            blocking,
            caller: None,
        }
    }

    /// The request message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The request payload handed along for the transport to interpret.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The record's status word.
    #[must_use]
    pub fn status(&self) -> RemoteStatus {
        self.status
    }

    /// Whether a caller is suspended awaiting this record's response.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Attaches the transport's response and flips the status to
    /// [`RemoteStatus::Recv`].
    pub fn respond(&mut self, data: Vec<u8>) {
        self.response = Some(data);
        self.status = RemoteStatus::Recv;
    }

    pub(crate) fn set_caller(&mut self, caller: Box<Task>) {
        debug_assert!(self.blocking);
        self.caller = Some(caller);
    }

    pub(crate) fn take_caller(&mut self) -> Option<Box<Task>> {
        self.caller.take()
    }

    pub(crate) fn take_response(&mut self) -> Option<Vec<u8>> {
        self.response.take()
    }
}

impl std::fmt::Debug for RemoteTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTask")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("payload_len", &self.payload.len())
            .field("blocking", &self.blocking)
            .field("has_caller", &self.caller.is_some())
            .finish()
    }
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MSG_LENGTH {
        return message.to_owned();
    }
    let mut end = MAX_MSG_LENGTH;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_owned()
}

/// Error from the transport-facing surface.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The board has shut down; no further records are accepted.
    #[error("message board is closed")]
    Closed,
}

#[derive(Debug, Default)]
struct MessageQueues {
    outbound: VecDeque<RemoteTask>,
    inbound: VecDeque<RemoteTask>,
    closed: bool,
}

/// The paired outbound/inbound message queues.
#[derive(Debug, Default)]
pub(crate) struct MessageBoard {
    queues: Mutex<MessageQueues>,
    cond: Condvar,
}

impl MessageBoard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enqueues an outbound record and wakes the transport.
    pub(crate) fn push_outbound(&self, record: RemoteTask) {
        trace!(message = record.message(), blocking = record.is_blocking(), "remote request enqueued");
        let mut queues = self.queues.lock().expect("message board lock poisoned");
        queues.outbound.push_back(record);
        drop(queues);
        self.cond.notify_all();
    }

    /// Blocks until an outbound record is available, returning `None` once
    /// the board has shut down and the queue is empty.
    pub(crate) fn recv_outbound(&self) -> Option<RemoteTask> {
        let mut queues = self.queues.lock().expect("message board lock poisoned");
        loop {
            if let Some(record) = queues.outbound.pop_front() {
                return Some(record);
            }
            if queues.closed {
                return None;
            }
            queues = self
                .cond
                .wait(queues)
                .expect("message board lock poisoned");
        }
    }

    /// Enqueues an inbound record from the transport.
    pub(crate) fn push_inbound(&self, record: RemoteTask) -> Result<(), TransportError> {
        let mut queues = self.queues.lock().expect("message board lock poisoned");
        if queues.closed {
            return Err(TransportError::Closed);
        }
        queues.inbound.push_back(record);
        drop(queues);
        self.cond.notify_all();
        Ok(())
    }

    /// Takes every inbound record in one critical section. Processing
    /// happens after the lock is released so the message mutex is never
    /// held while a ready-queue mutex is taken.
    pub(crate) fn drain_inbound(&self) -> VecDeque<RemoteTask> {
        let mut queues = self.queues.lock().expect("message board lock poisoned");
        std::mem::take(&mut queues.inbound)
    }

    /// Closes the board and returns both queues for teardown; wakes every
    /// transport waiter so it observes termination.
    pub(crate) fn close_and_drain(&self) -> (VecDeque<RemoteTask>, VecDeque<RemoteTask>) {
        let mut queues = self.queues.lock().expect("message board lock poisoned");
        queues.closed = true;
        let drained = (
            std::mem::take(&mut queues.outbound),
            std::mem::take(&mut queues.inbound),
        );
        drop(queues);
        self.cond.notify_all();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_truncated_to_limit() {
        let long = "x".repeat(MAX_MSG_LENGTH + 40);
        let record = RemoteTask::new(&long, Vec::new(), false);
        assert_eq!(record.message().len(), MAX_MSG_LENGTH);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; build a string whose byte 254 falls mid-char.
        let long = "é".repeat(MAX_MSG_LENGTH);
        let record = RemoteTask::new(&long, Vec::new(), false);
        assert!(record.message().len() <= MAX_MSG_LENGTH);
        assert!(record.message().chars().all(|c| c == 'é'));
    }

    #[test]
    fn respond_flips_status() {
        let mut record = RemoteTask::new("ping", Vec::new(), true);
        assert_eq!(record.status(), RemoteStatus::Send);
        record.respond(b"pong".to_vec());
        assert_eq!(record.status(), RemoteStatus::Recv);
        assert_eq!(record.take_response().as_deref(), Some(&b"pong"[..]));
    }

    #[test]
    fn closed_board_rejects_inbound_and_unblocks_receivers() {
        let board = MessageBoard::new();
        board.push_outbound(RemoteTask::new("one", Vec::new(), false));
        board.close_and_drain();
        assert!(board.recv_outbound().is_none());
        let err = board
            .push_inbound(RemoteTask::new("late", Vec::new(), false))
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn outbound_fifo_order() {
        let board = MessageBoard::new();
        board.push_outbound(RemoteTask::new("first", Vec::new(), false));
        board.push_outbound(RemoteTask::new("second", Vec::new(), false));
        assert_eq!(board.recv_outbound().unwrap().message(), "first");
        assert_eq!(board.recv_outbound().unwrap().message(), "second");
    }
}
