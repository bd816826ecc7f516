use super::{Dispatcher, ThreadPool};

use std::sync::Arc;

/// The dispatchers owned by one [`Runtime`](crate::Runtime).
///
/// Holds the compute pool, the IO pool and the unconfined dispatcher.
/// Cloning the registry shares the same pools.
#[derive(Clone, Debug)]
pub struct Dispatchers {
    compute: Dispatcher,
    io: Dispatcher,
    unconfined: Dispatcher,
}

impl Dispatchers {
    /// Creates the registry. No thread is started until work is dispatched.
    pub(crate) fn new(compute_threads: usize, io_threads: usize, thread_prefix: &str) -> Self {
        Self {
            compute: Dispatcher::new(Arc::new(ThreadPool::new(
                "compute",
                thread_prefix,
                compute_threads,
            ))),
            io: Dispatcher::new(Arc::new(ThreadPool::new("io", thread_prefix, io_threads))),
            unconfined: Dispatcher::unconfined(),
        }
    }

    /// Pool for CPU-bound work, one thread per available processor.
    pub fn compute(&self) -> &Dispatcher {
        &self.compute
    }

    /// Pool for blocking work, at least 64 threads.
    pub fn io(&self) -> &Dispatcher {
        &self.io
    }

    /// Inline dispatcher, runs work on the resuming thread.
    pub fn unconfined(&self) -> &Dispatcher {
        &self.unconfined
    }

    /// Shuts down both pools. Idempotent.
    pub fn shutdown(&self) {
        self.compute.shutdown();
        self.io.shutdown();
    }

    /// Returns `true` once both pools have been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.compute.is_shutdown() && self.io.is_shutdown()
    }
}
