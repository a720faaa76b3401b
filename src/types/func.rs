//! Task function handles.
//!
//! A task function is a plain `fn()` paired with its symbolic name. The pair
//! is used both to run the task and to key its execution history; lookup
//! compares the function *pointer* so the name string stays off the hot path
//! and is only read when reporting.

use core::fmt;

/// The shape of a task function.
///
/// Task functions take no parameters; they read their argument through
/// [`task::args`](crate::task::args) and suspend through
/// [`task::yield_now`](crate::task::yield_now).
pub type TaskBody = fn();

/// A task function together with its symbolic name.
///
/// Build one with the [`task_fn!`](crate::task_fn) macro:
///
/// ```
/// use taskboard::task_fn;
///
/// fn step() {}
/// let func = task_fn!(step);
/// assert_eq!(func.name, "step");
/// ```
#[derive(Clone, Copy)]
pub struct TaskFn {
    /// The function to execute.
    pub body: TaskBody,
    /// The symbolic name, used as the history report label.
    pub name: &'static str,
}

impl TaskFn {
    /// The pointer-identity key used for history lookup.
    #[must_use]
    pub fn id(&self) -> FuncId {
        FuncId(self.body as usize)
    }
}

impl fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn").field("name", &self.name).finish()
    }
}

/// Pointer-identity handle for a task function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(usize);

/// Builds a [`TaskFn`] from a function item, capturing its name.
#[macro_export]
macro_rules! task_fn {
    ($f:ident) => {
        $crate::types::TaskFn {
            body: $f,
            name: stringify!($f),
        }
    };
}
