use super::injector::Injector;
use super::worker::Worker;
use super::{Dispatch, Job};

use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed-size pool of worker threads.
///
/// Threads are started lazily: every dispatch spawns one more worker while
/// the pool is below its size, so an unused pool owns no threads.
pub(crate) struct ThreadPool {
    /// Pool name (`"compute"`, `"io"`).
    name: Arc<str>,

    /// Prefix of the worker thread names.
    thread_prefix: String,

    /// Maximum number of workers.
    size: usize,

    /// Job queue shared with every worker.
    injector: Arc<Injector>,

    /// Join handles of the started workers.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Creates a pool that will run at most `size` workers.
    ///
    /// # Arguments
    ///
    /// * `name` - Pool name, used in thread names and logs
    /// * `thread_prefix` - Prefix of every worker thread name
    /// * `size` - Maximum number of worker threads
    pub(crate) fn new(name: &str, thread_prefix: &str, size: usize) -> Self {
        Self {
            name: Arc::from(name),
            thread_prefix: thread_prefix.to_owned(),
            size,
            injector: Arc::new(Injector::new()),
            workers: Mutex::new(Vec::with_capacity(size)),
        }
    }

    /// Number of workers started so far.
    #[cfg(test)]
    fn threads(&self) -> usize {
        self.workers.lock().len()
    }

    /// Starts one more worker unless the pool is already full.
    fn grow(&self) {
        let mut workers = self.workers.lock();
        if workers.len() >= self.size {
            return;
        }

        let id = workers.len();
        let worker = Worker::new(id, self.name.clone(), self.injector.clone());

        let spawned = thread::Builder::new()
            .name(format!("{}-{}-{}", self.thread_prefix, self.name, id))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => workers.push(handle),
            Err(err) => {
                tracing::warn!(pool = %self.name, worker = id, %err, "failed to spawn worker thread");
            }
        }
    }
}

impl Dispatch for ThreadPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, job: Job) {
        if !self.injector.push(job) {
            tracing::warn!(pool = %self.name, "work dispatched after shutdown was discarded");
            return;
        }

        self.grow();
    }

    /// Stops the pool and joins its workers.
    ///
    /// Already queued jobs are drained first. A worker calling `shutdown`
    /// on its own pool is not joined.
    fn shutdown(&self) {
        let handles = {
            let mut workers = self.workers.lock();
            if self.injector.shutdown() {
                tracing::debug!(pool = %self.name, threads = workers.len(), "shutting down pool");
            }
            mem::take(&mut *workers)
        };

        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }

    fn is_shutdown(&self) -> bool {
        self.injector.is_shutdown()
    }
}
