//! Taskboard: a cooperative, multi-priority task board.
//!
//! # Overview
//!
//! Taskboard executes many short-lived tasks as stackful coroutines across a
//! small pool of worker threads: one *primary* executor plus up to ten
//! *secondary* executors, each draining its own ready queue. Tasks yield
//! explicitly; nothing is preempted. The board exists for programs that need
//! thousands of I/O-light or computation-light units in flight without a
//! thread per unit, while a handful of latency-sensitive tasks still run
//! promptly through the priority class.
//!
//! # Core behaviors
//!
//! - **Priority classes**: [`Class::Priority`] tasks bypass to the head of
//!   the primary queue, [`Class::Primary`] tasks queue behind them, and
//!   [`Class::Secondary`] tasks spread across the secondary queues by
//!   shortest backlog.
//! - **Blocking subtasks**: a running task can spawn a child that replaces
//!   it in the execution pool; the parent resumes only after the child
//!   completes ([`task::block_on`]).
//! - **Remote tasks**: a running task can ship a request to an external
//!   transport and either await the response or continue immediately
//!   ([`task::call_remote`]).
//! - **Admission control**: the number of simultaneously live tasks is
//!   bounded; creation fails fast once the bound is hit.
//! - **Execution history**: per-function timing and yield statistics,
//!   updated on every completion and printable on demand.
//!
//! # Module structure
//!
//! - [`board`]: the task board itself (lifecycle, spawning, executors)
//! - [`task`]: in-task operations (yield, arguments, subtasks, remote calls)
//! - [`remote`]: remote-task records and the transport-facing message board
//! - [`history`]: the per-function execution history table
//! - [`config`]: contract constants and [`BoardConfig`]
//! - [`error`]: error types
//! - [`types`]: identifiers, classes, and task function handles
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard::{task, task_fn, BoardConfig, Class, TaskBoard};
//!
//! fn hello() {
//!     let greeting = task::args::<String>().expect("spawned with a String");
//!     task::yield_now();
//!     println!("{greeting}");
//! }
//!
//! let board = TaskBoard::new(BoardConfig::with_secondaries(2));
//! board.start().unwrap();
//! board
//!     .spawn(task_fn!(hello), Class::Primary, Some(Arc::new(String::from("hi"))))
//!     .unwrap();
//!
//! let killer = {
//!     let board = Arc::clone(&board);
//!     std::thread::spawn(move || board.kill())
//! };
//! board.destroy();
//! killer.join().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod board;
pub mod config;
pub mod error;
pub mod history;
pub mod remote;
pub mod task;
pub mod types;

pub use board::{TaskBoard, TaskMessage};
pub use config::{BoardConfig, MAX_MSG_LENGTH, MAX_SECONDARIES, MAX_TASKS, STACK_SIZE};
pub use error::{Error, ErrorKind, Result};
pub use history::{ExecRecord, ExecStats, History};
pub use remote::{RemoteStatus, RemoteTask, TransportError};
pub use task::TaskArgs;
pub use types::{Class, TaskFn, TaskId, TaskOrigin, TaskState};
