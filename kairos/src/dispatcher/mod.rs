//! Dispatchers decide which thread executes a unit of work.
//!
//! A dispatcher is a capability, not a per-task resource: every task bound
//! to it shares it. Three flavours exist:
//! - [`Dispatcher::unconfined`] runs work synchronously on the caller's
//!   thread,
//! - the **compute** pool, sized to the number of available processors,
//! - the **IO** pool, sized to at least 64 threads.
//!
//! The two pools are owned by a [`Dispatchers`] registry, itself owned by a
//! [`Runtime`](crate::Runtime), which shuts them down explicitly.

mod injector;
mod pool;
mod registry;
mod worker;

pub use registry::Dispatchers;

pub(crate) use pool::ThreadPool;

use std::fmt;
use std::sync::Arc;

/// A zero-argument unit of work handed to a dispatcher.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution strategy behind a [`Dispatcher`] handle.
pub(crate) trait Dispatch: Send + Sync {
    /// Human readable name, used in logs and errors.
    fn name(&self) -> &str;

    /// Submits `job` for execution. Never blocks the caller.
    fn dispatch(&self, job: Job);

    /// Stops accepting work. Idempotent.
    fn shutdown(&self);

    /// Whether [`shutdown`](Self::shutdown) has been requested.
    fn is_shutdown(&self) -> bool;
}

/// Shared handle to an execution strategy.
///
/// Cloning a `Dispatcher` is cheap and yields a handle to the same
/// underlying threads.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<dyn Dispatch>,
}

impl Dispatcher {
    pub(crate) fn new(inner: Arc<dyn Dispatch>) -> Self {
        Self { inner }
    }

    /// Creates a dispatcher that runs work inline, on whatever thread
    /// calls [`dispatch`](Self::dispatch).
    ///
    /// It never shuts down.
    pub fn unconfined() -> Self {
        Self::new(Arc::new(Unconfined))
    }

    /// Name of the dispatcher (`"unconfined"`, `"compute"`, `"io"`).
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Submits `work` for execution and returns immediately.
    ///
    /// Work submitted after [`shutdown`](Self::shutdown) is discarded.
    /// A panic inside `work` never reaches the caller.
    pub fn dispatch<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.dispatch(Box::new(work));
    }

    /// Stops accepting new work and releases owned threads once the
    /// already queued work has drained. Irreversible and idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Returns `true` once the dispatcher stopped accepting work.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    /// Returns `true` if both handles refer to the same dispatcher.
    pub fn same(&self, other: &Dispatcher) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Runs every job immediately on the dispatching thread.
struct Unconfined;

impl Dispatch for Unconfined {
    fn name(&self) -> &str {
        "unconfined"
    }

    fn dispatch(&self, job: Job) {
        job();
    }

    fn shutdown(&self) {}

    fn is_shutdown(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn unconfined_runs_on_the_calling_thread() {
        let dispatcher = Dispatcher::unconfined();
        let ran = Arc::new(AtomicBool::new(false));
        let caller = thread::current().id();

        let flag = ran.clone();
        dispatcher.dispatch(move || {
            assert_eq!(thread::current().id(), caller);
            flag.store(true, Ordering::SeqCst);
        });

        // Inline dispatch has already completed when `dispatch` returns.
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn unconfined_ignores_shutdown() {
        let dispatcher = Dispatcher::unconfined();
        dispatcher.shutdown();

        assert!(!dispatcher.is_shutdown());
        assert_eq!(dispatcher.name(), "unconfined");
    }

    #[test]
    fn clones_share_the_same_dispatcher() {
        let a = Dispatcher::unconfined();
        let b = a.clone();

        assert!(a.same(&b));
        assert!(!a.same(&Dispatcher::unconfined()));
    }
}
