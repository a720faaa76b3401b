//! The task board: queues, executors, admission, lifecycle.
//!
//! A [`TaskBoard`] owns one primary ready queue drained by the primary
//! executor thread, up to [`MAX_SECONDARIES`](crate::MAX_SECONDARIES)
//! secondary queues each drained by its own executor thread, the paired
//! remote message queues, the execution history table, and the admission
//! counter bounding simultaneously live tasks.
//!
//! # Lifecycle
//!
//! `new` → [`start`](TaskBoard::start) → … → [`kill`](TaskBoard::kill) +
//! [`destroy`](TaskBoard::destroy). `destroy` blocks joining the executor
//! threads until some thread calls `kill`; `kill` in turn blocks on the
//! board condvar until `destroy` has joined them. A caller that wants to
//! inspect final state (history, unfinished count) takes
//! [`protect`](TaskBoard::protect) before `kill` and reads while still
//! holding it; `destroy` acquires the same mutex before tearing the board
//! down.

pub(crate) mod executor;
pub(crate) mod queue;
pub(crate) mod sequencer;

use crate::config::BoardConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::history::History;
use crate::remote::{MessageBoard, RemoteTask, TransportError};
use crate::task::{Task, TaskArgs};
use crate::types::{Class, TaskFn, TaskOrigin};
use executor::Role;
use queue::ReadyQueue;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Board lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoardStatus {
    Created,
    Started,
}

#[derive(Debug)]
struct Lifecycle {
    status: BoardStatus,
    workers: Vec<JoinHandle<()>>,
}

/// Shutdown rendezvous: `kill` waits here until `destroy` has joined the
/// executors.
#[derive(Debug, Default)]
struct ShutdownGate {
    joined: Mutex<bool>,
    cond: Condvar,
}

/// A task request delivered by an external adapter (the transport-issued
/// counterpart of [`TaskBoard::spawn`]).
#[derive(Debug)]
pub struct TaskMessage {
    /// The function to execute.
    pub func: TaskFn,
    /// The priority class to place the task in.
    pub class: Class,
    /// The argument handle for the task.
    pub args: Option<TaskArgs>,
}

impl TaskMessage {
    /// Builds a task message.
    #[must_use]
    pub fn new(func: TaskFn, class: Class, args: Option<TaskArgs>) -> Self {
        Self { func, class, args }
    }
}

/// The cooperative multi-priority task board.
pub struct TaskBoard {
    config: BoardConfig,
    primary: ReadyQueue,
    secondaries: Vec<ReadyQueue>,
    messages: MessageBoard,
    history: History,
    concurrent: AtomicUsize,
    priority_in_flight: AtomicUsize,
    shutdown: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    gate: ShutdownGate,
    protect: Mutex<()>,
}

impl TaskBoard {
    /// Creates a board from `config`. The secondary count is capped at
    /// [`MAX_SECONDARIES`](crate::MAX_SECONDARIES).
    #[must_use]
    pub fn new(config: BoardConfig) -> Arc<Self> {
        let secondaries = (0..config.effective_secondaries())
            .map(|_| ReadyQueue::new())
            .collect();
        Arc::new(Self {
            config,
            primary: ReadyQueue::new(),
            secondaries,
            messages: MessageBoard::new(),
            history: History::new(),
            concurrent: AtomicUsize::new(0),
            priority_in_flight: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                status: BoardStatus::Created,
                workers: Vec::new(),
            }),
            gate: ShutdownGate::default(),
            protect: Mutex::new(()),
        })
    }

    /// The board's configuration.
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Spawns the primary executor and one thread per secondary queue.
    /// Calling `start` on an already-started board is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().expect("board lifecycle lock poisoned");
        if lifecycle.status == BoardStatus::Started {
            return Ok(());
        }
        let mut workers = Vec::with_capacity(1 + self.secondaries.len());
        let spawn_result = (|| -> Result<()> {
            let board = Arc::clone(self);
            workers.push(
                thread::Builder::new()
                    .name("tb-primary".into())
                    .spawn(move || executor::run(&board, Role::Primary))
                    .map_err(spawn_error)?,
            );
            for index in 0..self.secondaries.len() {
                let board = Arc::clone(self);
                workers.push(
                    thread::Builder::new()
                        .name(format!("tb-secondary-{index}"))
                        .spawn(move || executor::run(&board, Role::Secondary(index)))
                        .map_err(spawn_error)?,
                );
            }
            Ok(())
        })();
        if let Err(e) = spawn_result {
            // Tear down whatever did start before reporting failure.
            self.shutdown.store(true, Ordering::Release);
            self.primary.notify_all();
            for queue in &self.secondaries {
                queue.notify_all();
            }
            for handle in workers {
                let _ = handle.join();
            }
            return Err(e);
        }
        lifecycle.workers = workers;
        lifecycle.status = BoardStatus::Started;
        debug!(secondaries = self.secondaries.len(), "task board started");
        Ok(())
    }

    /// Signals the board to terminate: raises the shutdown flag, wakes every
    /// executor, then blocks on the board condvar until [`destroy`] has
    /// joined all executor threads.
    ///
    /// Returns `false` if the board was never started or has already been
    /// shut down.
    ///
    /// [`destroy`]: TaskBoard::destroy
    pub fn kill(&self) -> bool {
        {
            let lifecycle = self.lifecycle.lock().expect("board lifecycle lock poisoned");
            if lifecycle.status != BoardStatus::Started {
                return false;
            }
        }
        {
            let joined = self.gate.joined.lock().expect("shutdown gate lock poisoned");
            if *joined {
                return false;
            }
        }
        debug!("task board kill requested");
        self.shutdown.store(true, Ordering::Release);
        self.primary.notify_all();
        for queue in &self.secondaries {
            queue.notify_all();
        }
        let mut joined = self.gate.joined.lock().expect("shutdown gate lock poisoned");
        while !*joined {
            joined = self
                .gate
                .cond
                .wait(joined)
                .expect("shutdown gate lock poisoned");
        }
        true
    }

    /// Joins the executor threads (blocking until [`kill`] lets them exit),
    /// then drains every ready queue and both message queues, clears the
    /// history table, and wakes transport and `kill` waiters.
    ///
    /// On a never-started board this tears down immediately.
    ///
    /// [`kill`]: TaskBoard::kill
    pub fn destroy(&self) {
        let workers = {
            let mut lifecycle = self.lifecycle.lock().expect("board lifecycle lock poisoned");
            std::mem::take(&mut lifecycle.workers)
        };
        for handle in workers {
            let _ = handle.join();
        }
        // Executors are gone: release kill() before teardown so a caller
        // holding `protect` across it can inspect final state first.
        {
            let mut joined = self.gate.joined.lock().expect("shutdown gate lock poisoned");
            *joined = true;
        }
        self.gate.cond.notify_all();
        let _protect = self.protect.lock().expect("board protect lock poisoned");
        let mut freed = self.primary.drain().len();
        for queue in &self.secondaries {
            freed += queue.drain().len();
        }
        let (outbound, inbound) = self.messages.close_and_drain();
        debug!(
            tasks = freed,
            outbound = outbound.len(),
            inbound = inbound.len(),
            "task board drained"
        );
        drop((outbound, inbound));
        self.history.clear();
    }

    /// True once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// The board protection mutex. Hold the guard across [`kill`] and any
    /// final-state inspection; [`destroy`] acquires it before tearing the
    /// board down.
    ///
    /// [`kill`]: TaskBoard::kill
    /// [`destroy`]: TaskBoard::destroy
    #[must_use]
    pub fn protect(&self) -> MutexGuard<'_, ()> {
        self.protect.lock().expect("board protect lock poisoned")
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    /// Number of simultaneously live tasks.
    #[must_use]
    pub fn concurrent(&self) -> usize {
        self.concurrent.load(Ordering::Relaxed)
    }

    /// Atomically increments the live-task count iff it is below the
    /// admission limit, returning the new count, or `None` at the limit.
    pub fn add_concurrent(&self) -> Option<usize> {
        let limit = self.config.max_tasks;
        self.concurrent
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                (count < limit).then_some(count + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Unconditionally increments the live-task count.
    pub fn inc_concurrent(&self) {
        self.concurrent.fetch_add(1, Ordering::Relaxed);
    }

    /// Unconditionally decrements the live-task count.
    pub fn deinc_concurrent(&self) {
        self.concurrent.fetch_sub(1, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------
    // Spawning and placement
    // ------------------------------------------------------------------

    /// Creates a task and places it in the ready queue of its class.
    ///
    /// Fails with [`ErrorKind::AdmissionDenied`] at the admission limit and
    /// [`ErrorKind::CoroutineCreate`] if the coroutine stack cannot be
    /// allocated (in which case the live-task count is rolled back and no
    /// execution is recorded).
    ///
    /// Spawning onto a created-but-not-started board queues the task until
    /// [`start`](TaskBoard::start).
    pub fn spawn(&self, func: TaskFn, class: Class, args: Option<TaskArgs>) -> Result<()> {
        let origin = if crate::task::in_task() {
            TaskOrigin::NonBlockingChild
        } else {
            TaskOrigin::Local
        };
        self.spawn_with_origin(func, class, args, origin)
    }

    /// Handles a transport-issued task request through the same admission,
    /// history, and placement path as [`spawn`](TaskBoard::spawn).
    ///
    /// An [`ErrorKind::AdmissionDenied`] result means the adapter should
    /// requeue the message and retry later.
    pub fn process_message(&self, message: TaskMessage) -> Result<()> {
        self.spawn_with_origin(
            message.func,
            message.class,
            message.args,
            TaskOrigin::RemoteIssued,
        )
    }

    fn spawn_with_origin(
        &self,
        func: TaskFn,
        class: Class,
        args: Option<TaskArgs>,
        origin: TaskOrigin,
    ) -> Result<()> {
        if self.add_concurrent().is_none() {
            return Err(Error::new(ErrorKind::AdmissionDenied)
                .with_context(format!("{} tasks in flight", self.config.max_tasks)));
        }
        let mut task = match Task::new(func, class, origin, args, self.config.stack_size) {
            Ok(task) => task,
            Err(e) => {
                self.deinc_concurrent();
                return Err(e);
            }
        };
        task.set_hist(self.history.record_exec(&func));
        if class == Class::Priority {
            self.priority_in_flight.fetch_add(1, Ordering::Relaxed);
        }
        trace!(task = %task.id(), func = func.name, class = class.as_str(), "task created");
        self.place(task);
        Ok(())
    }

    /// Registers a blocking child built inside a running task: records its
    /// execution in history without touching the admission counter.
    pub(crate) fn prepare_child(&self, mut child: Task) -> Task {
        child.set_hist(self.history.record_exec(&child.func()));
        if child.class() == Class::Priority {
            self.priority_in_flight.fetch_add(1, Ordering::Relaxed);
        }
        child
    }

    /// Places a task into the ready queue of its class: `Priority` at the
    /// head of the primary queue, `Primary` at its tail, `Secondary` on its
    /// home queue or, for first placement, the shortest secondary queue
    /// (ties to the lowest index).
    pub(crate) fn place(&self, mut task: Task) {
        task.set_state(crate::types::TaskState::Initialized);
        match task.class() {
            Class::Priority => self.primary.push_front(task),
            Class::Primary => self.primary.push_back(task),
            Class::Secondary => self.place_secondary(task, false),
        }
    }

    /// Reinserts a plainly-yielded task, honoring the head/tail reinsertion
    /// policy. A head reinsertion never displaces a `Priority` task already
    /// waiting at the head of the primary queue.
    pub(crate) fn requeue_yield(&self, mut task: Task) {
        task.set_state(crate::types::TaskState::Initialized);
        let at_head = self.config.reinsert_at_head;
        match task.class() {
            Class::Priority => self.primary.push_front(task),
            Class::Primary => {
                if at_head {
                    self.primary.push_after_priorities(task);
                } else {
                    self.primary.push_back(task);
                }
            }
            Class::Secondary => self.place_secondary(task, at_head),
        }
    }

    fn place_secondary(&self, mut task: Task, at_head: bool) {
        if self.secondaries.is_empty() {
            // No secondary executors configured; fall back to the primary.
            self.primary.push_back(task);
            return;
        }
        let index = match task.home() {
            Some(index) => index,
            None => {
                let index = self
                    .secondaries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, queue)| queue.len())
                    .map_or(0, |(index, _)| index);
                task.set_home(index);
                index
            }
        };
        if at_head {
            self.secondaries[index].push_front(task);
        } else {
            self.secondaries[index].push_back(task);
        }
        if self.config.signal_primary_on_secondary_insert {
            self.primary.notify_all();
        }
    }

    // ------------------------------------------------------------------
    // Transport surface
    // ------------------------------------------------------------------

    /// Blocks until an outbound remote record is available, returning
    /// `None` once the board has been destroyed. This is the transport
    /// adapter's consume loop.
    pub fn recv_outbound(&self) -> Option<RemoteTask> {
        self.messages.recv_outbound()
    }

    /// Delivers a remote response from the transport. Also wakes the
    /// primary executor so an otherwise idle board runs the sequencer
    /// promptly.
    pub fn send_inbound(&self, record: RemoteTask) -> std::result::Result<(), TransportError> {
        self.messages.push_inbound(record)?;
        self.primary.notify_all();
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// The execution history table.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Writes one history line per recorded function to `out`.
    pub fn print_records(&self, out: &mut impl io::Write) -> io::Result<()> {
        self.history.print_records(out)
    }

    // ------------------------------------------------------------------
    // Executor internals
    // ------------------------------------------------------------------

    pub(crate) fn shutdown_flag(&self) -> &AtomicBool {
        &self.shutdown
    }

    pub(crate) fn primary_queue(&self) -> &ReadyQueue {
        &self.primary
    }

    pub(crate) fn secondary_queue(&self, index: usize) -> &ReadyQueue {
        &self.secondaries[index]
    }

    pub(crate) fn secondary_queues(&self) -> &[ReadyQueue] {
        &self.secondaries
    }

    pub(crate) fn messages(&self) -> &MessageBoard {
        &self.messages
    }

    /// Primary helping is allowed only while no `Priority` task is in
    /// flight.
    pub(crate) fn helping_allowed(&self) -> bool {
        !self.secondaries.is_empty() && self.priority_in_flight.load(Ordering::Relaxed) == 0
    }

    pub(crate) fn priority_done(&self) {
        self.priority_in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("secondaries", &self.secondaries.len())
            .field("concurrent", &self.concurrent())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

fn spawn_error(e: io::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_context("spawning executor thread")
        .with_source(e)
}
