use crate::error::TaskError;
use crate::runtime::queue::TaskQueue;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Single-threaded driver of a [`TaskQueue`].
///
/// The `EventLoop` is responsible for:
/// - pulling the next due task from the queue,
/// - starting it on its dispatcher unless it already completed,
/// - parking the driving thread while nothing is due,
/// - stopping on [`quit`](Self::quit) or on the first task failure.
///
/// Its state only moves forward: `Idle → Running → Stopped`.
pub(crate) struct EventLoop {
    queue: Arc<TaskQueue>,
    state: AtomicU8,
}

impl EventLoop {
    pub(crate) fn new(queue: Arc<TaskQueue>) -> Self {
        Self {
            queue,
            state: AtomicU8::new(IDLE),
        }
    }

    pub(crate) fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Drives the queue on the calling thread until it stops.
    ///
    /// Returns the failure that stopped the loop, if any. Calling `run` on
    /// a loop that already ran returns immediately.
    pub(crate) fn run(&self) -> Result<(), TaskError> {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("event loop already ran");
            return Ok(());
        }

        tracing::debug!("event loop running");

        while let Some(task) = self.queue.poll() {
            if !task.is_completed() {
                task.start();
            }
        }

        self.state.store(STOPPED, Ordering::Release);
        tracing::debug!("event loop stopped");

        match self.queue.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Requests an orderly stop. Tasks still queued are not started.
    pub(crate) fn quit(&self) {
        if !self.queue.is_stopped() {
            tracing::debug!("event loop quit requested");
        }
        self.queue.stop_polling();
    }

    /// Returns `true` until the loop was asked to stop or a task failed.
    pub(crate) fn is_active(&self) -> bool {
        !self.queue.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::time::delay;

    use std::thread;
    use std::time::{Duration, Instant};

    fn explode() {
        panic!("boom");
    }

    #[test]
    fn runs_tasks_until_quit() {
        let event_loop = Arc::new(EventLoop::new(Arc::new(TaskQueue::new())));

        let quitter = event_loop.clone();
        let first = event_loop.queue().spawn(Dispatcher::unconfined(), async { 1 });
        let second = event_loop.queue().spawn(Dispatcher::unconfined(), async move {
            delay(Duration::from_millis(20)).await;
            quitter.quit();
            2
        });

        let start = Instant::now();
        assert_eq!(event_loop.run(), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(first.is_completed());
        assert!(second.is_completed());
        assert!(!event_loop.is_active());
    }

    #[test]
    fn failure_stops_the_loop() {
        let event_loop = EventLoop::new(Arc::new(TaskQueue::new()));

        let failing = event_loop
            .queue()
            .spawn(Dispatcher::unconfined(), async { explode() });
        let sleeping = event_loop.queue().spawn(Dispatcher::unconfined(), async {
            delay(Duration::from_secs(60)).await;
        });

        let start = Instant::now();
        let err = event_loop.run().unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(
            err,
            TaskError::Failed {
                task: failing.id(),
                message: "boom".to_owned(),
            }
        );
        assert!(!sleeping.is_completed());
    }

    #[test]
    fn quit_from_another_thread_unparks_the_loop() {
        let event_loop = Arc::new(EventLoop::new(Arc::new(TaskQueue::new())));
        let quitter = event_loop.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            quitter.quit();
        });

        assert_eq!(event_loop.run(), Ok(()));
        assert_eq!(event_loop.run(), Ok(()));
        handle.join().unwrap();
    }
}
