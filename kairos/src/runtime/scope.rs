use crate::dispatcher::{Dispatcher, Dispatchers};
use crate::error::{Error, Result, TaskError};
use crate::runtime::context;
use crate::runtime::event_loop::EventLoop;
use crate::runtime::task::{Join, Task, TaskId, TaskRef};

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

struct ScopeInner {
    event_loop: Arc<EventLoop>,
    dispatchers: Dispatchers,

    /// Live members, keyed by id so that iteration follows launch order.
    members: Mutex<BTreeMap<TaskId, TaskRef>>,
}

/// Structured-concurrency boundary of a [`run_blocking`](crate::run_blocking)
/// call.
///
/// Every task launched through a scope is tracked until it completes.
/// The scope can cancel or join all of them at once. Clones share the same
/// membership and event loop.
///
/// # Examples
///
/// ```rust,ignore
/// kairos::run_blocking(|scope| async move {
///     let child = scope.clone();
///     scope.launch(async move {
///         delay(Duration::from_secs(2)).await;
///     });
///     scope.launch(async move { child.cancel() });
/// })?;
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn new(event_loop: Arc<EventLoop>, dispatchers: Dispatchers) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                event_loop,
                dispatchers,
                members: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Launches `future` on the unconfined dispatcher.
    ///
    /// The task starts when the event loop reaches it and runs inline on
    /// whichever thread resumes it.
    pub fn launch<F, T>(&self, future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.spawn(self.inner.dispatchers.unconfined().clone(), future)
    }

    /// Launches `future` on `dispatcher`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatcherShutdown`] if the dispatcher no longer
    /// accepts work.
    pub fn launch_on<F, T>(&self, dispatcher: &Dispatcher, future: F) -> Result<Task<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + Sync + 'static,
    {
        if dispatcher.is_shutdown() {
            return Err(Error::DispatcherShutdown {
                name: dispatcher.name().to_owned(),
            });
        }

        Ok(self.spawn(dispatcher.clone(), future))
    }

    /// Runs `future` on `dispatcher` and waits for its value.
    ///
    /// The current task is suspended, not blocked, while the sub-computation
    /// runs elsewhere.
    ///
    /// # Errors
    ///
    /// Fails if the dispatcher is shut down, or if the sub-computation
    /// failed or was canceled.
    pub async fn with_context<F, T>(&self, dispatcher: &Dispatcher, future: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let output = slot.clone();

        let task = self.launch_on(dispatcher, async move {
            let value = future.await;
            *output.lock() = Some(value);
        })?;
        let id = task.id();

        task.await?;

        let value = slot.lock().take();
        value.ok_or(Error::Task(TaskError::Canceled(id)))
    }

    /// Stops the event loop, then cancels every live member.
    ///
    /// Members launched after the call are not affected.
    pub fn cancel(&self) {
        self.quit();

        let members = self.snapshot();
        tracing::debug!(members = members.len(), "canceling scope");

        for task in members {
            task.cancel();
        }
    }

    /// Waits for every live member to end.
    ///
    /// Members are snapshotted first, so tasks launched while waiting are
    /// not awaited. A canceled member is not an error. The calling task is
    /// skipped if it is itself a member.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first failed member, in launch order.
    pub async fn join(&self) -> std::result::Result<(), TaskError> {
        let current = context::current_task().map(|task| task.id());
        let members: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|task| Some(task.id()) != current)
            .collect();

        tracing::debug!(members = members.len(), "joining scope");

        for task in members {
            Join::new(task).await?;
        }

        Ok(())
    }

    /// Returns `true` while the owning event loop is neither quit nor
    /// stopped by a failure.
    pub fn is_active(&self) -> bool {
        self.inner.event_loop.is_active()
    }

    /// Dispatchers of the runtime this scope belongs to.
    pub fn dispatchers(&self) -> &Dispatchers {
        &self.inner.dispatchers
    }

    /// Number of members that have not completed yet.
    pub fn len(&self) -> usize {
        self.inner.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.members.lock().is_empty()
    }

    /// Waits until no member is left, including members launched while
    /// waiting.
    pub(crate) async fn join_all(&self) -> std::result::Result<(), TaskError> {
        while !self.is_empty() && self.is_active() {
            self.join().await?;
        }

        Ok(())
    }

    pub(crate) fn quit(&self) {
        self.inner.event_loop.quit();
    }

    fn spawn<F, T>(&self, dispatcher: Dispatcher, future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let task = self.inner.event_loop.queue().spawn(dispatcher, future);
        let id = task.id();

        self.inner.members.lock().insert(id, task.as_task_ref());

        let inner = Arc::downgrade(&self.inner);
        task.on_completion(move |_| {
            if let Some(inner) = inner.upgrade() {
                inner.members.lock().remove(&id);
            }
        });

        task
    }

    fn snapshot(&self) -> Vec<TaskRef> {
        self.inner.members.lock().values().cloned().collect()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("members", &self.len())
            .field("active", &self.is_active())
            .finish()
    }
}
