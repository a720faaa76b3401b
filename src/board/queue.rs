//! Ready queues.
//!
//! Each executor drains one `ReadyQueue`: a FIFO of tasks behind its own
//! mutex and condition variable. Inserts signal the condvar; executors wait
//! with a short timeout so a signal sent while no waiter held the mutex can
//! never strand them.

use crate::task::Task;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    inner: Mutex<VecDeque<Task>>,
    cond: Condvar,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends at the tail and signals the executor.
    pub(crate) fn push_back(&self, task: Task) {
        let mut queue = self.inner.lock().expect("ready queue lock poisoned");
        queue.push_back(task);
        drop(queue);
        self.cond.notify_all();
    }

    /// Inserts at the head (priority bypass / head reinsertion) and signals
    /// the executor.
    pub(crate) fn push_front(&self, task: Task) {
        let mut queue = self.inner.lock().expect("ready queue lock poisoned");
        queue.push_front(task);
        drop(queue);
        self.cond.notify_all();
    }

    /// Inserts at the head but behind any leading `Priority` tasks, so a
    /// yielded task resumes next without displacing a priority insertion.
    pub(crate) fn push_after_priorities(&self, task: Task) {
        let mut queue = self.inner.lock().expect("ready queue lock poisoned");
        let index = queue
            .iter()
            .take_while(|queued| queued.class() == crate::types::Class::Priority)
            .count();
        queue.insert(index, task);
        drop(queue);
        self.cond.notify_all();
    }

    /// Pops the head without waiting.
    pub(crate) fn pop(&self) -> Option<Task> {
        self.inner
            .lock()
            .expect("ready queue lock poisoned")
            .pop_front()
    }

    /// Pops the head, waiting up to `tick` for an insert. Returns `None` on
    /// timeout or when `shutdown` is observed, letting the caller re-run its
    /// loop preamble.
    pub(crate) fn pop_or_wait(&self, shutdown: &AtomicBool, tick: Duration) -> Option<Task> {
        let mut queue = self.inner.lock().expect("ready queue lock poisoned");
        loop {
            if let Some(task) = queue.pop_front() {
                return Some(task);
            }
            if shutdown.load(Ordering::Acquire) {
                return None;
            }
            let (guard, timeout) = self
                .cond
                .wait_timeout(queue, tick)
                .expect("ready queue lock poisoned");
            queue = guard;
            if timeout.timed_out() {
                return None;
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("ready queue lock poisoned").len()
    }

    /// Wakes every waiter (shutdown broadcast).
    pub(crate) fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Empties the queue for teardown.
    pub(crate) fn drain(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.inner.lock().expect("ready queue lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STACK_SIZE;
    use crate::task_fn;
    use crate::types::{Class, TaskOrigin};

    fn noop() {}

    fn sample_task() -> Task {
        task_of(Class::Primary)
    }

    fn task_of(class: Class) -> Task {
        Task::new(task_fn!(noop), class, TaskOrigin::Local, None, STACK_SIZE).unwrap()
    }

    #[test]
    fn fifo_order() {
        let queue = ReadyQueue::new();
        let (a, b) = (sample_task(), sample_task());
        let (id_a, id_b) = (a.id(), b.id());
        queue.push_back(a);
        queue.push_back(b);
        assert_eq!(queue.pop().unwrap().id(), id_a);
        assert_eq!(queue.pop().unwrap().id(), id_b);
    }

    #[test]
    fn head_insert_bypasses() {
        let queue = ReadyQueue::new();
        let (a, b) = (sample_task(), sample_task());
        let id_b = b.id();
        queue.push_back(a);
        queue.push_front(b);
        assert_eq!(queue.pop().unwrap().id(), id_b);
    }

    #[test]
    fn head_reinsertion_stays_behind_priority_tasks() {
        let queue = ReadyQueue::new();
        let priority = task_of(Class::Priority);
        let yielded = sample_task();
        let (id_priority, id_yielded) = (priority.id(), yielded.id());
        queue.push_front(priority);
        queue.push_after_priorities(yielded);
        assert_eq!(queue.pop().unwrap().id(), id_priority);
        assert_eq!(queue.pop().unwrap().id(), id_yielded);
    }

    #[test]
    fn wait_times_out_when_empty() {
        let queue = ReadyQueue::new();
        let shutdown = AtomicBool::new(false);
        assert!(queue
            .pop_or_wait(&shutdown, Duration::from_millis(5))
            .is_none());
    }

    #[test]
    fn wait_observes_shutdown() {
        let queue = ReadyQueue::new();
        let shutdown = AtomicBool::new(true);
        assert!(queue
            .pop_or_wait(&shutdown, Duration::from_secs(60))
            .is_none());
    }
}
