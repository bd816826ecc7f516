use super::core::{Callback, Core, Runnable, TaskRef};
use super::join::Join;
use super::waker::WakerSlot;
use super::TaskId;
use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Handle to a launched task.
///
/// `Task` implements [`Future`]: awaiting it suspends the current task
/// until the result is set, then yields the value or the stored
/// [`TaskError`]. Awaiting an already completed task returns immediately.
///
/// Handles are cheap to clone and every clone observes the same result,
/// which is why awaiting requires `T: Clone`. Dropping a handle does
/// **not** cancel the task.
///
/// # Examples
///
/// ```rust,ignore
/// kairos::run_blocking(|scope| async move {
///     let task = scope.launch(async { 21 * 2 });
///     assert_eq!(task.await, Ok(42));
/// })?;
/// ```
pub struct Task<T> {
    core: Arc<Core<T>>,

    /// Registration of this handle's pending `await`, if any.
    waiter: Option<Arc<WakerSlot>>,
}

impl<T: Send + Sync + 'static> Task<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core, waiter: None }
    }

    /// Identifier of the task.
    pub fn id(&self) -> TaskId {
        self.core.task_id()
    }

    /// Returns `true` until the task completes, fails or is canceled.
    pub fn is_active(&self) -> bool {
        !self.core.completed()
    }

    /// Returns `true` once the result slot is set.
    pub fn is_completed(&self) -> bool {
        self.core.completed()
    }

    /// Returns `true` if the task ended through [`cancel`](Self::cancel).
    pub fn is_canceled(&self) -> bool {
        self.core.canceled()
    }

    /// Cancels the task.
    ///
    /// No-op if the task already completed. Otherwise the result becomes
    /// [`TaskError::Canceled`], completion callbacks run, and the body is
    /// never resumed again. A resumption step already running on another
    /// thread is not interrupted. Idempotent.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    /// Waits for completion without reading the value.
    ///
    /// Cancellation counts as a normal end: only a failure is returned as
    /// an error.
    pub fn join(&self) -> Join {
        Join::new(self.as_task_ref())
    }

    /// Registers `callback` to receive the final result.
    ///
    /// Callbacks run exactly once, in registration order, on the thread
    /// that completes the task. If the task is already completed the
    /// callback runs synchronously before this method returns.
    ///
    /// Order is only kept among callbacks registered before completion. A
    /// callback registered once the result is set runs on the registering
    /// thread right away, possibly before the earlier callbacks finished
    /// running on the completing thread.
    pub fn invoke_on_completion<F>(&self, callback: F)
    where
        F: FnOnce(Result<&T, &TaskError>) + Send + 'static,
    {
        self.core.register(Callback::Typed(Box::new(callback)));
    }

    pub(crate) fn as_task_ref(&self) -> TaskRef {
        self.core.clone()
    }

    /// Whether the body is being polled or is about to be.
    pub(crate) fn is_in_flight(&self) -> bool {
        self.core.in_flight()
    }

    pub(crate) fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(Option<&TaskError>) + Send + 'static,
    {
        self.core.on_completion(Box::new(callback));
    }
}

impl<T: Clone + Send + Sync + 'static> Task<T> {
    /// Returns a copy of the result if the task already completed.
    pub(crate) fn try_result(&self) -> Option<Result<T, TaskError>> {
        self.core.result().cloned()
    }
}

impl<T: Clone + Send + Sync + 'static> Future for Task<T> {
    type Output = Result<T, TaskError>;

    /// Polls the task's result.
    ///
    /// The first pending poll registers a single completion callback; later
    /// polls only refresh the waker it will use. The result is checked
    /// again after registering to avoid missed wake-ups.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(result) = this.core.result() {
            return Poll::Ready(result.clone());
        }

        match &this.waiter {
            Some(waiter) => waiter.update(cx.waker()),
            None => {
                let waiter = Arc::new(WakerSlot::new(cx.waker()));
                let slot = waiter.clone();
                this.core
                    .register(Callback::Erased(Box::new(move |_| slot.wake())));
                this.waiter = Some(waiter);
            }
        }

        match this.core.result() {
            Some(result) => Poll::Ready(result.clone()),
            None => Poll::Pending,
        }
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            waiter: None,
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("completed", &self.is_completed())
            .finish()
    }
}
