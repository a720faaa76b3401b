//! Executor worker loop.
//!
//! Each executor thread runs this loop: drain inbound remote responses,
//! take a task from its queue, resume the coroutine, interpret the yield.
//! The primary executor may additionally help drain the longest secondary
//! queue when its own queue is empty and no priority task is in flight;
//! a helped task returns to its home queue on its next yield.

use super::sequencer;
use super::TaskBoard;
use crate::task::{Resume, ResumeOutcome, Switch, Task};
use crate::types::{Class, TaskOrigin, TaskState};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How long an idle executor waits on its condvar before re-running the
/// loop preamble (sequencer + shutdown check).
const DISPATCH_TICK: Duration = Duration::from_millis(10);

/// Which queue an executor thread is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// Drains the primary queue and may help the secondaries.
    Primary,
    /// Drains one secondary queue.
    Secondary(usize),
}

/// The executor thread body.
pub(crate) fn run(board: &TaskBoard, role: Role) {
    debug!(?role, "executor running");
    loop {
        sequencer::drain_responses(board);
        if board.is_shutdown() {
            break;
        }
        let Some(task) = next_task(board, role) else {
            continue;
        };
        dispatch(board, task);
    }
    debug!(?role, "executor exiting");
}

fn next_task(board: &TaskBoard, role: Role) -> Option<Task> {
    match role {
        Role::Secondary(index) => board
            .secondary_queue(index)
            .pop_or_wait(board.shutdown_flag(), DISPATCH_TICK),
        Role::Primary => {
            if let Some(task) = board.primary_queue().pop() {
                return Some(task);
            }
            if board.helping_allowed() {
                if let Some(task) = steal_from_longest(board) {
                    trace!(task = %task.id(), "primary helping secondary queue");
                    return Some(task);
                }
            }
            board
                .primary_queue()
                .pop_or_wait(board.shutdown_flag(), DISPATCH_TICK)
        }
    }
}

/// Takes the head of the longest non-empty secondary queue (ties to the
/// lowest index).
fn steal_from_longest(board: &TaskBoard) -> Option<Task> {
    let (index, len) = board
        .secondary_queues()
        .iter()
        .enumerate()
        .map(|(index, queue)| (index, queue.len()))
        .max_by_key(|&(index, len)| (len, std::cmp::Reverse(index)))?;
    if len == 0 {
        return None;
    }
    board.secondary_queue(index).pop()
}

fn dispatch(board: &TaskBoard, mut task: Task) {
    task.set_state(TaskState::Running);
    trace!(task = %task.id(), func = task.name(), "resuming");
    let started = Instant::now();
    let outcome = task.resume();
    task.add_run_time(started.elapsed());
    match outcome {
        ResumeOutcome::Finished { ok } => finish(board, task, ok),
        ResumeOutcome::Yielded(Switch::Yield) => {
            task.note_yield();
            board.requeue_yield(task);
        }
        ResumeOutcome::Yielded(Switch::BlockOn(mut child)) => {
            // The suspended parent leaves the pool inside the child; the
            // child's completion brings it back.
            trace!(parent = %task.id(), child = %child.id(), "parent blocked on child");
            child.set_parent(Box::new(task));
            board.place(*child);
        }
        ResumeOutcome::Yielded(Switch::Remote(mut record)) => {
            if record.is_blocking() {
                record.set_caller(Box::new(task));
                board.messages().push_outbound(*record);
            } else {
                board.messages().push_outbound(*record);
                board.requeue_yield(task);
            }
        }
    }
}

fn finish(board: &TaskBoard, mut task: Task, ok: bool) {
    task.set_state(TaskState::Completed);
    if let Some(hist) = task.hist() {
        hist.note_completion(task.run_time(), task.yields());
    }
    // Blocking children replaced their parent and were never counted.
    if task.origin() != TaskOrigin::BlockingChild {
        board.deinc_concurrent();
    }
    if task.class() == Class::Priority {
        board.priority_done();
    }
    trace!(task = %task.id(), func = task.name(), ok, "task completed");
    if let Some(mut parent) = task.take_parent() {
        parent.set_pending(Resume::ChildDone { ok });
        board.place(*parent);
    }
}
