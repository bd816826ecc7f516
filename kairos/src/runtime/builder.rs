use super::Runtime;

use std::thread;

/// Smallest size of the IO pool.
const MIN_IO_THREADS: usize = 64;

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing the dispatcher pools before
/// constructing the runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .compute_threads(4)
///     .io_threads(128)
///     .thread_name("worker")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    /// Size of the compute pool.
    compute_threads: usize,

    /// Size of the IO pool.
    io_threads: usize,

    /// Prefix of the pool thread names.
    thread_name: String,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    ///
    /// The compute pool gets one thread per available logical CPU, falling
    /// back to `1` if unavailable. The IO pool gets the same count, but
    /// never less than 64 threads.
    pub fn new() -> Self {
        let cpus = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            compute_threads: cpus,
            io_threads: cpus.max(MIN_IO_THREADS),
            thread_name: "kairos".to_owned(),
        }
    }

    /// Sets the size of the compute pool.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn compute_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "compute_threads must be > 0");

        self.compute_threads = n;
        self
    }

    /// Sets the size of the IO pool.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn io_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "io_threads must be > 0");

        self.io_threads = n;
        self
    }

    /// Sets the prefix of the pool thread names.
    ///
    /// Workers are named `<prefix>-compute-<i>` and `<prefix>-io-<i>`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// No thread is started until work is dispatched to a pool.
    pub fn build(self) -> Runtime {
        tracing::debug!(
            compute_threads = self.compute_threads,
            io_threads = self.io_threads,
            "building runtime"
        );

        Runtime::new(self.compute_threads, self.io_threads, &self.thread_name)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
