//! Operations available inside a running task.

use super::{current, Resume, Switch, Task, TaskArgs};
use crate::board::TaskBoard;
use crate::error::{Error, ErrorKind, Result};
use crate::remote::RemoteTask;
use crate::types::{Class, TaskFn, TaskOrigin};
use std::any::Any;
use std::sync::Arc;

/// Suspends the current task, returning control to its executor.
///
/// The task is reinserted into its ready queue per the board's reinsertion
/// policy. Calling this outside a task is a no-op.
pub fn yield_now() {
    let _resume = current::switch(Switch::Yield);
}

/// The argument handle the current task was spawned with, untyped.
///
/// Returns `None` outside a task or when the task was spawned without
/// arguments.
#[must_use]
pub fn raw_args() -> Option<TaskArgs> {
    current::args()
}

/// The argument handle the current task was spawned with, downcast to `T`.
///
/// Returns `None` outside a task, when the task has no arguments, or when
/// the argument is not a `T`.
#[must_use]
pub fn args<T: Any + Send + Sync>() -> Option<Arc<T>> {
    current::args().and_then(|a| a.downcast::<T>().ok())
}

/// Spawns a blocking child task and suspends the caller until it completes.
///
/// The child takes the caller's place in the execution pool: it does not
/// count against the admission limit, and the caller is reinserted into its
/// ready queue only once the child terminates. Returns `Ok(true)` if the
/// child's function returned normally, `Ok(false)` if it panicked, and
/// [`ErrorKind::NotInTask`] when called outside a task.
///
/// Nested blocking children are allowed.
pub fn block_on(
    board: &TaskBoard,
    func: TaskFn,
    class: Class,
    args: Option<TaskArgs>,
) -> Result<bool> {
    if !current::is_active() {
        return Err(Error::new(ErrorKind::NotInTask).with_context("block_on"));
    }
    let child = Task::new(
        func,
        class,
        TaskOrigin::BlockingChild,
        args,
        board.config().stack_size,
    )?;
    let child = board.prepare_child(child);
    match current::switch(Switch::BlockOn(Box::new(child))) {
        Some(Resume::ChildDone { ok }) => Ok(ok),
        None => Err(Error::new(ErrorKind::NotInTask).with_context("block_on")),
        Some(other) => Err(Error::new(ErrorKind::Internal)
            .with_context(format!("unexpected resume after block_on: {other:?}"))),
    }
}

/// Ships a remote request to the external transport.
///
/// `message` is truncated to [`MAX_MSG_LENGTH`](crate::MAX_MSG_LENGTH)
/// bytes; `payload` travels with the record for the transport to interpret.
///
/// Blocking calls suspend the caller until the response arrives and return
/// it (`Ok(Some(data))`, or `Ok(None)` if the transport answered without a
/// body). Non-blocking calls suspend once for fairness, are reinserted
/// immediately, and always return `Ok(None)`.
///
/// Returns [`ErrorKind::NotInTask`] when called outside a task.
pub fn call_remote(
    board: &TaskBoard,
    message: &str,
    payload: Vec<u8>,
    blocking: bool,
) -> Result<Option<Vec<u8>>> {
    if !current::is_active() {
        return Err(Error::new(ErrorKind::NotInTask).with_context("call_remote"));
    }
    if board.is_shutdown() {
        return Err(Error::new(ErrorKind::Shutdown).with_context("call_remote"));
    }
    let record = RemoteTask::new(message, payload, blocking);
    match current::switch(Switch::Remote(Box::new(record))) {
        Some(Resume::Response(data)) => Ok(data),
        Some(Resume::Schedule) => Ok(None),
        None => Err(Error::new(ErrorKind::NotInTask).with_context("call_remote")),
        Some(other) => Err(Error::new(ErrorKind::Internal)
            .with_context(format!("unexpected resume after call_remote: {other:?}"))),
    }
}
