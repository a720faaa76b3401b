//! The task model and in-task operations.
//!
//! A [`Task`] owns a stackful coroutine running its task function, the
//! argument handle shared with the spawner, and a handle to its execution
//! history record. A blocking child additionally owns its suspended parent:
//! "the child replaces the parent in the execution pool" is literal
//! ownership transfer, and completion hands the parent back to a ready
//! queue.
//!
//! The free functions in this module ([`yield_now`], [`args`], [`block_on`],
//! [`call_remote`]) are the operations available *inside* a running task.

mod api;
mod current;

pub use api::{args, block_on, call_remote, raw_args, yield_now};

/// True if the calling thread is currently inside a running task.
#[must_use]
pub fn in_task() -> bool {
    current::is_active()
}

use crate::error::{Error, ErrorKind, Result};
use crate::history::ExecRecord;
use crate::remote::RemoteTask;
use crate::types::{Class, TaskFn, TaskId, TaskOrigin, TaskState};
use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Opaque argument handle passed to a task at creation.
pub type TaskArgs = Arc<dyn Any + Send + Sync>;

/// Why a task's coroutine suspended, handed to the executor as the yield
/// value.
pub(crate) enum Switch {
    /// Plain cooperative yield; reinsert per policy.
    Yield,
    /// A blocking child was constructed; the executor adopts the suspended
    /// parent into it and publishes the child in the parent's stead.
    BlockOn(Box<Task>),
    /// A remote record was constructed; the executor publishes it on the
    /// outbound queue (capturing the suspended caller when blocking).
    Remote(Box<RemoteTask>),
}

/// The value a suspended task receives when next resumed.
#[derive(Debug)]
pub(crate) enum Resume {
    /// Ordinary dispatch.
    Schedule,
    /// The blocking child completed; `ok` is false if it panicked.
    ChildDone {
        /// Whether the child's function returned normally.
        ok: bool,
    },
    /// The blocking remote response arrived.
    Response(Option<Vec<u8>>),
}

/// Outcome of one coroutine resume, as seen by the executor.
pub(crate) enum ResumeOutcome {
    /// The task function returned (`ok`) or panicked (`!ok`).
    Finished {
        /// Whether the function returned normally.
        ok: bool,
    },
    /// The task suspended with the given reason.
    Yielded(Switch),
}

type TaskCoroutine = Coroutine<Resume, Switch, ()>;

// SAFETY: `corosensei::Coroutine` is `!Send` only because it cannot verify
// that data captured on its stack is `Send`. `Task`'s coroutine is built
// from a `TaskFn` plus `TaskArgs` (`Arc<dyn Any + Send + Sync>`), both
// `Send`, and all other `Task` fields are themselves `Send`, so moving a
// `Task` (and thus its suspended coroutine) across threads is sound.
unsafe impl Send for Task {}

/// A schedulable unit: one task function, one coroutine, one queue slot.
pub struct Task {
    id: TaskId,
    func: TaskFn,
    class: Class,
    origin: TaskOrigin,
    state: TaskState,
    // Dropped before the coroutine so an orphaned blocking chain tears down
    // parent-first.
    parent: Option<Box<Task>>,
    coroutine: TaskCoroutine,
    args: Option<TaskArgs>,
    hist: Option<Arc<ExecRecord>>,
    home: Option<usize>,
    pending: Option<Resume>,
    run_time: Duration,
    yields: u64,
}

impl Task {
    /// Builds a task and its coroutine.
    ///
    /// Fails with [`ErrorKind::CoroutineCreate`] if the stack cannot be
    /// allocated.
    pub(crate) fn new(
        func: TaskFn,
        class: Class,
        origin: TaskOrigin,
        args: Option<TaskArgs>,
        stack_size: usize,
    ) -> Result<Self> {
        let stack = DefaultStack::new(stack_size).map_err(|e| {
            Error::new(ErrorKind::CoroutineCreate)
                .with_context(format!("stack allocation ({stack_size} bytes)"))
                .with_source(e)
        })?;
        let body = func.body;
        let task_args = args.clone();
        let coroutine = Coroutine::with_stack(stack, move |yielder, _first: Resume| {
            // Publish the yielder and argument handle for the duration of
            // the task function; the guard clears them on return or unwind.
            let _active = current::enter(yielder, task_args);
            body();
        });
        Ok(Self {
            id: TaskId::next(),
            func,
            class,
            origin,
            state: TaskState::Initialized,
            parent: None,
            coroutine,
            args,
            hist: None,
            home: None,
            pending: None,
            run_time: Duration::ZERO,
            yields: 0,
        })
    }

    /// The task's identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The task's function handle.
    #[must_use]
    pub fn func(&self) -> TaskFn {
        self.func
    }

    /// The symbolic name of the task function.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.func.name
    }

    /// The task's priority class.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Where the task came from.
    #[must_use]
    pub fn origin(&self) -> TaskOrigin {
        self.origin
    }

    /// The task's lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Cumulative time spent resumed.
    #[must_use]
    pub fn run_time(&self) -> Duration {
        self.run_time
    }

    /// Number of plain yields so far.
    #[must_use]
    pub fn yields(&self) -> u64 {
        self.yields
    }

    pub(crate) fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    pub(crate) fn set_hist(&mut self, hist: Arc<ExecRecord>) {
        self.hist = Some(hist);
    }

    pub(crate) fn hist(&self) -> Option<&Arc<ExecRecord>> {
        self.hist.as_ref()
    }

    pub(crate) fn set_parent(&mut self, parent: Box<Task>) {
        debug_assert!(self.parent.is_none());
        self.parent = Some(parent);
    }

    pub(crate) fn take_parent(&mut self) -> Option<Box<Task>> {
        self.parent.take()
    }

    pub(crate) fn home(&self) -> Option<usize> {
        self.home
    }

    pub(crate) fn set_home(&mut self, index: usize) {
        self.home = Some(index);
    }

    pub(crate) fn set_pending(&mut self, resume: Resume) {
        self.pending = Some(resume);
    }

    /// Bumps the task's yield count and the history running total.
    pub(crate) fn note_yield(&mut self) {
        self.yields += 1;
        if let Some(hist) = &self.hist {
            hist.note_yield();
        }
    }

    pub(crate) fn add_run_time(&mut self, elapsed: Duration) {
        self.run_time += elapsed;
    }

    /// Resumes the coroutine with the pending resume value (or a plain
    /// dispatch), containing any panic from the task function.
    pub(crate) fn resume(&mut self) -> ResumeOutcome {
        let input = self.pending.take().unwrap_or(Resume::Schedule);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.coroutine.resume(input)));
        match result {
            Ok(CoroutineResult::Return(())) => ResumeOutcome::Finished { ok: true },
            Ok(CoroutineResult::Yield(switch)) => ResumeOutcome::Yielded(switch),
            Err(_) => {
                error!(task = %self.id, func = self.func.name, "task function panicked");
                ResumeOutcome::Finished { ok: false }
            }
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("func", &self.func.name)
            .field("class", &self.class)
            .field("origin", &self.origin)
            .field("state", &self.state)
            .field("yields", &self.yields)
            .finish_non_exhaustive()
    }
}
