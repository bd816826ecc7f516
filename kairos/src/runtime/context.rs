use crate::runtime::task::TaskRef;

use std::cell::RefCell;

thread_local! {
    /// Task whose resumption step is running on this thread.
    ///
    /// Set around every poll of a task body so that suspension points
    /// (`delay`, `Scope::join`) can reach the task without explicit
    /// parameter passing.
    static CURRENT_TASK: RefCell<Option<TaskRef>> = const { RefCell::new(None) };
}

/// Runs `f` with `task` installed as the current task of this thread.
///
/// The previous value is restored afterwards, so nested steps (an inline
/// dispatcher resuming another task from inside a poll) see their own task.
///
/// # Arguments
///
/// * `task` - The task being resumed.
/// * `f` - Closure executed inside the task context.
///
/// # Returns
///
/// Returns the result of the closure `f`.
pub(crate) fn enter_task<R>(task: TaskRef, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_TASK.with(|current| current.replace(Some(task)));
    let out = f();
    CURRENT_TASK.with(|current| current.replace(prev));

    out
}

/// Returns the task currently being resumed on this thread, if any.
pub(crate) fn current_task() -> Option<TaskRef> {
    CURRENT_TASK.with(|current| current.borrow().clone())
}
