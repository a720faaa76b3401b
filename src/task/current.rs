//! Thread-local context of the currently-dispatched task.
//!
//! The coroutine publishes its yielder and argument handle here on entry;
//! every suspension takes the context out and republishes it on resume, so
//! the context always lives in the thread-local slot of whichever executor
//! thread is actually running the task (a task can migrate to the primary
//! executor through queue helping).

use super::{Resume, Switch, TaskArgs};
use corosensei::Yielder;
use std::cell::RefCell;
use std::ptr::NonNull;

pub(super) struct TaskContext {
    yielder: NonNull<Yielder<Resume, Switch>>,
    args: Option<TaskArgs>,
}

thread_local! {
    static CURRENT: RefCell<Option<TaskContext>> = const { RefCell::new(None) };
}

/// Guard returned by [`enter`]; clears the slot when the task function
/// returns or unwinds.
pub(super) struct ActiveTask;

impl Drop for ActiveTask {
    fn drop(&mut self) {
        CURRENT.with(|slot| slot.borrow_mut().take());
    }
}

/// Publishes the running task's context for the duration of its function.
pub(super) fn enter(yielder: &Yielder<Resume, Switch>, args: Option<TaskArgs>) -> ActiveTask {
    let context = TaskContext {
        yielder: NonNull::from(yielder),
        args,
    };
    CURRENT.with(|slot| *slot.borrow_mut() = Some(context));
    ActiveTask
}

/// True if the calling thread is currently inside a task function.
pub(crate) fn is_active() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Clones the current task's argument handle, if inside a task.
pub(super) fn args() -> Option<TaskArgs> {
    CURRENT.with(|slot| slot.borrow().as_ref().and_then(|c| c.args.clone()))
}

/// Suspends the current task with `reason`, returning the resume value, or
/// `None` when called outside a task.
///
/// The context is removed from this thread's slot before suspending and
/// republished (possibly on a different executor thread) after the resume.
pub(super) fn switch(reason: Switch) -> Option<Resume> {
    let context = CURRENT.with(|slot| slot.borrow_mut().take())?;
    let yielder = context.yielder;
    // Safety: the yielder lives on the coroutine's own stack, which outlives
    // every suspension of that coroutine; we are inside the coroutine here,
    // so the pointed-to yielder is valid.
    let resume = unsafe { yielder.as_ref() }.suspend(reason);
    CURRENT.with(|slot| *slot.borrow_mut() = Some(context));
    Some(resume)
}
