use super::event_loop::EventLoop;
use super::queue::TaskQueue;
use super::scope::Scope;
use crate::dispatcher::{Dispatcher, Dispatchers};
use crate::error::{Error, Result, TaskError};

use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How long the caller waits between two checks of a root still running
/// after the loop stopped.
const SETTLE_INTERVAL: Duration = Duration::from_millis(10);

/// The runtime: the dispatchers tasks run on.
///
/// `Runtime` is responsible for:
/// - owning the compute pool, the IO pool and the unconfined dispatcher,
/// - driving a root computation to completion on the calling thread via
///   [`run_blocking`](Self::run_blocking),
/// - shutting its pools down once the computation is over.
///
/// Dropping the runtime shuts the pools down as well.
pub struct Runtime {
    dispatchers: Dispatchers,
}

impl Runtime {
    /// Creates a runtime. Pool threads are started on first use.
    ///
    /// # Arguments
    ///
    /// * `compute_threads` - Size of the compute pool
    /// * `io_threads` - Size of the IO pool
    /// * `thread_prefix` - Prefix of every pool thread name
    pub(crate) fn new(compute_threads: usize, io_threads: usize, thread_prefix: &str) -> Self {
        Self {
            dispatchers: Dispatchers::new(compute_threads, io_threads, thread_prefix),
        }
    }

    /// Dispatchers owned by this runtime.
    pub fn dispatchers(&self) -> &Dispatchers {
        &self.dispatchers
    }

    /// Runs the computation built by `body`, blocking the current thread.
    ///
    /// The root task runs on the unconfined dispatcher, so it starts on the
    /// calling thread, which also drives the event loop. Once the root and
    /// every task of its scope have ended, the loop stops and the value is
    /// returned. A root still running on another thread when the loop
    /// stops is waited for. A root parked on a wake-up that can no longer
    /// come is canceled.
    ///
    /// # Errors
    ///
    /// Returns the first task failure, from the root or from any
    /// descendant. If the loop was quit (see [`Scope::cancel`]) before the
    /// root could produce its value, returns a cancellation error.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let value = RuntimeBuilder::new().build().run_blocking(|scope| async move {
    ///     let task = scope.launch(async { 21 * 2 });
    ///     task.await
    /// })?;
    /// assert_eq!(value, Ok(42));
    /// ```
    pub fn run_blocking<B, F, T>(self, body: B) -> Result<T>
    where
        B: FnOnce(Scope) -> F,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let dispatcher = self.dispatchers.unconfined().clone();
        self.run_blocking_on(&dispatcher, body)
    }

    /// Same as [`run_blocking`](Self::run_blocking), with the root task
    /// bound to `dispatcher`.
    ///
    /// # Errors
    ///
    /// Also returns [`Error::DispatcherShutdown`] if `dispatcher` no longer
    /// accepts work.
    pub fn run_blocking_on<B, F, T>(self, dispatcher: &Dispatcher, body: B) -> Result<T>
    where
        B: FnOnce(Scope) -> F,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if dispatcher.is_shutdown() {
            return Err(Error::DispatcherShutdown {
                name: dispatcher.name().to_owned(),
            });
        }

        let queue = Arc::new(TaskQueue::new());
        let event_loop = Arc::new(EventLoop::new(queue.clone()));
        let scope = Scope::new(event_loop.clone(), self.dispatchers.clone());

        let slot = Arc::new(Mutex::new(None));
        let output = slot.clone();
        let future = body(scope.clone());
        let root_scope = scope.clone();

        let root = queue.spawn(dispatcher.clone(), async move {
            let value = future.await;
            *output.lock() = Some(value);

            let joined = root_scope.join_all().await;
            root_scope.quit();
            joined
        });

        let settled = Arc::new(Latch::default());
        let signal = settled.clone();
        root.on_completion(move |_| signal.open());

        tracing::debug!(root = %root.id(), dispatcher = dispatcher.name(), "running blocking");

        let looped = event_loop.run();

        self.dispatchers.shutdown();

        // Nothing can resume the leftovers once the pools are gone.
        scope.cancel();
        queue.clear();

        // The root may have been resumed on a foreign thread and still be
        // running there. Only a parked root is cut off.
        while root.is_active() {
            if !root.is_in_flight() {
                root.cancel();
                break;
            }
            settled.wait_for(SETTLE_INTERVAL);
        }

        looped?;

        root.try_result()
            .unwrap_or_else(|| Err(TaskError::Canceled(root.id())))
            .and_then(|joined| joined)?;

        let value = slot.lock().take();
        value.ok_or_else(|| TaskError::Canceled(root.id()).into())
    }

    /// Shuts down the compute and IO pools. Idempotent.
    pub fn shutdown(&self) {
        self.dispatchers.shutdown();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.dispatchers.shutdown();
    }
}

/// One-shot flag the caller blocks on until the root completes.
#[derive(Default)]
struct Latch {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    fn wait_for(&self, timeout: Duration) {
        let mut open = self.open.lock();
        if !*open {
            self.cond.wait_for(&mut open, timeout);
        }
    }
}

/// Runs `body` on a runtime with the default configuration.
///
/// Shorthand for `RuntimeBuilder::new().build().run_blocking(body)`.
///
/// # Examples
///
/// ```rust,ignore
/// let greeting = kairos::run_blocking(|scope| async move {
///     let hello = scope.launch(async { "Hello" });
///     hello.await
/// })?;
/// ```
pub fn run_blocking<B, F, T>(body: B) -> Result<T>
where
    B: FnOnce(Scope) -> F,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    super::builder::RuntimeBuilder::new().build().run_blocking(body)
}
