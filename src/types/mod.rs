//! Core types for the task board.
//!
//! - [`id`]: identifier types ([`TaskId`], [`FuncId`])
//! - [`func`]: task function handles ([`TaskFn`] and the [`task_fn!`] macro)
//! - classes and lifecycle states for tasks
//!
//! [`task_fn!`]: crate::task_fn

pub mod func;
pub mod id;

pub use func::{FuncId, TaskBody, TaskFn};
pub use id::TaskId;

/// Priority class of a task, determining which ready queue it lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Latency-sensitive: inserted at the *head* of the primary queue.
    Priority,
    /// Inserted at the tail of the primary queue.
    Primary,
    /// Spread across the secondary queues by shortest backlog.
    Secondary,
}

impl Class {
    /// A short static name for logging and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOrigin {
    /// Spawned from outside any task.
    Local,
    /// Spawned from within a running task, without blocking it.
    NonBlockingChild,
    /// Spawned from within a running task, replacing it until completion.
    BlockingChild,
    /// Issued by the remote transport via a task message.
    RemoteIssued,
}

/// Lifecycle state of a task.
///
/// `Running` implies the task is owned by an executor and is in no ready
/// queue; `Completed` implies it has been removed from every queue and its
/// coroutine is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created (or suspended) and eligible for dispatch.
    Initialized,
    /// Currently resumed by exactly one executor.
    Running,
    /// Terminal: the task function returned (or panicked).
    Completed,
}
