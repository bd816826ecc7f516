use crate::task::TaskId;

use thiserror::Error;

/// Convenience alias used by the fallible runtime entry points.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Terminal failure of a single task.
///
/// A `TaskError` lives in the task's result slot and is handed out to
/// every awaiter and completion callback, so it is cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task was canceled before its body produced a value.
    #[error("{0} canceled")]
    Canceled(TaskId),

    /// The task body panicked.
    #[error("{task} failed: {message}")]
    Failed { task: TaskId, message: String },
}

impl TaskError {
    /// Returns `true` for the cancellation outcome.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled(_))
    }

    /// The task this error originates from.
    pub fn task(&self) -> TaskId {
        match self {
            TaskError::Canceled(task) => *task,
            TaskError::Failed { task, .. } => *task,
        }
    }
}

/// Errors reported by the runtime entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A task failed or was canceled.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Work was requested on a dispatcher that no longer accepts it.
    #[error("dispatcher `{name}` has been shut down")]
    DispatcherShutdown { name: String },
}
