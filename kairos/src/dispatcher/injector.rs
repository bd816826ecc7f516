use super::Job;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Shared job queue of a thread pool.
///
/// Dispatching threads push jobs; worker threads block in [`pop`](Self::pop)
/// until a job arrives or the pool shuts down. Shutdown is a drain: workers
/// keep popping until the queue is empty and only then exit.
pub(crate) struct Injector {
    /// Pending jobs and the shutdown flag, updated together.
    state: Mutex<State>,

    /// Signalled on every push and on shutdown.
    condvar: Condvar,
}

struct State {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Queues a job and wakes one parked worker.
    ///
    /// Returns `false` (dropping the job) if the pool is shutting down.
    pub(crate) fn push(&self, job: Job) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }

        state.jobs.push_back(job);
        drop(state);

        self.condvar.notify_one();
        true
    }

    /// Blocks until a job is available.
    ///
    /// Returns `None` once the pool is shut down and every queued job has
    /// been handed out.
    pub(crate) fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();

        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }

            if state.shutdown {
                return None;
            }

            self.condvar.wait(&mut state);
        }
    }

    /// Stops accepting jobs and wakes every parked worker.
    ///
    /// Returns `true` for the call that actually performed the transition.
    pub(crate) fn shutdown(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.shutdown;
        state.shutdown = true;
        drop(state);

        self.condvar.notify_all();
        first
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }
}
