use super::TaskId;
use super::state::{COMPLETED, IDLE, NOTIFIED, RUNNING, SCHEDULED};
use super::waker::make_waker;
use crate::dispatcher::Dispatcher;
use crate::error::TaskError;
use crate::runtime::context;
use crate::runtime::queue::TaskQueue;

use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Shared handle to a task whose output type has been erased.
pub(crate) type TaskRef = Arc<dyn Runnable>;

/// Completion callback that only cares about the failure, if any.
pub(crate) type ErasedCallback = Box<dyn FnOnce(Option<&TaskError>) + Send>;

/// Completion callback receiving the task's final result.
pub(crate) type TypedCallback<T> = Box<dyn FnOnce(Result<&T, &TaskError>) + Send>;

/// A task as seen by the scheduling queue, the event loop and scopes.
///
/// The trait abstracts over the output type so heterogeneous tasks can
/// share one queue through [`TaskRef`].
pub(crate) trait Runnable: Send + Sync {
    fn id(&self) -> TaskId;

    /// Requests a resumption step on the task's dispatcher.
    fn start(self: Arc<Self>);

    /// Asks the owning scheduling queue to start the task again once
    /// `delay` has elapsed.
    fn reschedule(self: Arc<Self>, delay: Duration);

    fn cancel(&self);

    fn is_completed(&self) -> bool;

    /// `None` while running, then `Ok(())` or the stored error.
    fn status(&self) -> Option<Result<(), TaskError>>;

    fn on_completion(&self, callback: ErasedCallback);
}

pub(crate) enum Callback<T> {
    Typed(TypedCallback<T>),
    Erased(ErasedCallback),
}

impl<T> Callback<T> {
    fn invoke(self, result: &Result<T, TaskError>) {
        match self {
            Callback::Typed(callback) => callback(result.as_ref()),
            Callback::Erased(callback) => callback(result.as_ref().err()),
        }
    }
}

/// Shared state of a task.
///
/// The body is a pinned future polled by [`run`](Self::run) on the task's
/// dispatcher. The result slot is written once; the write and the drain of
/// the callback list happen under the same lock, so a callback registered
/// concurrently with completion is either drained or fired on the spot.
pub(crate) struct Core<T> {
    id: TaskId,

    /// The body. `None` once it finished or was dropped by cancellation.
    future: Mutex<Option<BoxFuture<T>>>,

    /// Final result. First writer wins.
    result: OnceLock<Result<T, TaskError>>,

    /// Callbacks waiting for the result, in registration order.
    callbacks: Mutex<Vec<Callback<T>>>,

    /// Resumption state (see [`state`](super::state)).
    state: AtomicUsize,

    /// Where resumption steps run.
    dispatcher: Dispatcher,

    /// Queue that created the task; receives delay requests.
    scheduler: Weak<TaskQueue>,
}

impl<T: Send + Sync + 'static> Core<T> {
    pub(crate) fn new<F>(future: F, dispatcher: Dispatcher, scheduler: Weak<TaskQueue>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            id: TaskId::next(),
            future: Mutex::new(Some(Box::pin(future))),
            result: OnceLock::new(),
            callbacks: Mutex::new(Vec::new()),
            state: AtomicUsize::new(IDLE),
            dispatcher,
            scheduler,
        }
    }

    pub(crate) fn task_id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn result(&self) -> Option<&Result<T, TaskError>> {
        self.result.get()
    }

    pub(crate) fn completed(&self) -> bool {
        self.result.get().is_some()
    }

    pub(crate) fn canceled(&self) -> bool {
        matches!(self.result.get(), Some(Err(TaskError::Canceled(_))))
    }

    /// Whether a step is running, or queued on a dispatcher that will
    /// still execute it.
    pub(crate) fn in_flight(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            RUNNING | NOTIFIED | COMPLETED => true,
            SCHEDULED => !self.dispatcher.is_shutdown(),
            _ => false,
        }
    }

    /// Registers a completion callback, or fires it right away if the
    /// result is already set.
    ///
    /// A late callback does not wait for the drain started by
    /// [`complete`](Self::complete): it may run before, or concurrently
    /// with, callbacks registered earlier.
    pub(crate) fn register(&self, callback: Callback<T>) {
        {
            let mut callbacks = self.callbacks.lock();
            if self.result.get().is_none() {
                callbacks.push(callback);
                return;
            }
        }

        if let Some(result) = self.result.get() {
            callback.invoke(result);
        }
    }

    /// Writes the result and runs the pending callbacks.
    ///
    /// Returns `false` if the slot was already set.
    fn complete(&self, result: Result<T, TaskError>) -> bool {
        let callbacks = {
            let mut callbacks = self.callbacks.lock();
            if self.result.set(result).is_err() {
                return false;
            }
            mem::take(&mut *callbacks)
        };

        if let Some(result) = self.result.get() {
            for callback in callbacks {
                callback.invoke(result);
            }
        }

        true
    }

    /// Moves an idle task to its dispatcher, or flags a running one so it
    /// is polled again after the current step.
    pub(crate) fn schedule(self: &Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self.completed() {
                        return;
                    }

                    if self
                        .state
                        .compare_exchange(IDLE, SCHEDULED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.dispatch();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already pending a resumption, or done.
                _ => return,
            }
        }
    }

    fn dispatch(self: &Arc<Self>) {
        tracing::trace!(task.id = %self.id, dispatcher = self.dispatcher.name(), "dispatching task");

        let task = self.clone();
        self.dispatcher.dispatch(move || task.run());
    }

    /// Executes one resumption step.
    ///
    /// A wake that arrives while the body runs is served by re-enqueueing
    /// the task. Once the queue is gone or stopped, the body is polled again
    /// from this loop instead, so an inline dispatcher never nests steps.
    fn run(self: Arc<Self>) {
        if self
            .state
            .compare_exchange(SCHEDULED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            // Canceled between scheduling and now.
            if self.completed() {
                self.retire();
                return;
            }

            let Some(poll) = self.poll_body(&mut cx) else {
                self.state.store(COMPLETED, Ordering::Release);
                return;
            };

            match poll {
                Ok(Poll::Ready(value)) => {
                    self.state.store(COMPLETED, Ordering::Release);
                    tracing::trace!(task.id = %self.id, "task completed");
                    self.complete(Ok(value));
                    return;
                }
                Err(payload) => {
                    self.state.store(COMPLETED, Ordering::Release);
                    let message = panic_message(payload.as_ref());
                    tracing::error!(task.id = %self.id, %message, "task panicked");
                    self.complete(Err(TaskError::Failed {
                        task: self.id,
                        message,
                    }));
                    return;
                }
                Ok(Poll::Pending) => {
                    if !self.suspend() {
                        return;
                    }
                }
            }
        }
    }

    /// Polls the body once inside the task context.
    ///
    /// Returns `None` if the body was already dropped.
    fn poll_body(self: &Arc<Self>, cx: &mut Context<'_>) -> Option<thread::Result<Poll<T>>> {
        let mut slot = self.future.lock();
        let future = slot.as_mut()?;

        let current: TaskRef = self.clone();
        let poll = context::enter_task(current, || {
            panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(cx)))
        });

        if !matches!(poll, Ok(Poll::Pending)) {
            *slot = None;
        }

        Some(poll)
    }

    /// Leaves the running state after the body returned `Pending`.
    ///
    /// Returns `true` if the body must be polled again right away.
    fn suspend(self: &Arc<Self>) -> bool {
        // Canceled while the step ran.
        if self.completed() {
            self.retire();
            return false;
        }

        if self
            .state
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return false;
        }

        // Woken while running: go through the ready queue so a task that
        // keeps waking itself cannot starve the others.
        match self.scheduler.upgrade().filter(|queue| !queue.is_stopped()) {
            Some(queue) => {
                self.state.store(IDLE, Ordering::Release);
                queue.enqueue(self.clone());
                false
            }
            None => {
                self.state.store(RUNNING, Ordering::Release);
                true
            }
        }
    }

    /// Marks the task finished and drops its body if nobody is polling it.
    fn retire(&self) {
        self.state.store(COMPLETED, Ordering::Release);

        if let Some(mut future) = self.future.try_lock() {
            *future = None;
        }
    }
}

impl<T: Send + Sync + 'static> Runnable for Core<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn start(self: Arc<Self>) {
        self.schedule();
    }

    fn reschedule(self: Arc<Self>, delay: Duration) {
        if self.completed() {
            return;
        }

        match self.scheduler.upgrade() {
            Some(queue) => queue.enqueue_delayed(self, delay),
            None => {
                tracing::warn!(task.id = %self.id, "delay requested after the event loop was dropped");
            }
        }
    }

    /// Completes the task with a cancellation error.
    ///
    /// Cooperative: a step already running on another thread finishes, but
    /// the body is never polled again.
    fn cancel(&self) {
        if self.completed() {
            return;
        }

        if !self.complete(Err(TaskError::Canceled(self.id))) {
            return;
        }

        tracing::debug!(task.id = %self.id, "task canceled");

        if let Some(mut future) = self.future.try_lock() {
            *future = None;
        }

        // Lets the poller drop a pending delayed entry of this task.
        if let Some(queue) = self.scheduler.upgrade() {
            queue.notify();
        }
    }

    fn is_completed(&self) -> bool {
        self.completed()
    }

    fn status(&self) -> Option<Result<(), TaskError>> {
        self.result.get().map(|result| match result {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        })
    }

    fn on_completion(&self, callback: ErasedCallback) {
        self.register(Callback::Erased(callback));
    }
}

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_owned()
    }
}
