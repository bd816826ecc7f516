use crate::runtime::context;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Suspends the current task for `duration`.
///
/// The task is handed to the scheduling queue with a deadline and its
/// thread is released: pool workers never sleep on a timer. A zero
/// duration completes immediately without touching the queue.
///
/// # Panics
///
/// Panics if a non-zero delay is polled outside of a task.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// delay(Duration::from_millis(10)).await;
/// ```
pub fn delay(duration: Duration) -> Delay {
    Delay::new(duration)
}

/// Suspends the current task for `millis` milliseconds.
///
/// Non-positive values complete immediately.
pub fn delay_millis(millis: i64) -> Delay {
    let millis = u64::try_from(millis).unwrap_or(0);
    Delay::new(Duration::from_millis(millis))
}

/// A future that completes once its deadline is reached.
///
/// The deadline is fixed when the future is created. On the first pending
/// poll, the current task asks its queue to start it again at the
/// deadline. If the task is canceled meanwhile it is simply never resumed.
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct Delay {
    /// `None` when the deadline cannot be represented: never elapses.
    deadline: Option<Instant>,

    /// Whether the current task already requested its rescheduling.
    registered: bool,
}

impl Delay {
    pub(crate) fn new(duration: Duration) -> Self {
        let deadline = if duration.is_zero() {
            Some(Instant::now())
        } else {
            Instant::now().checked_add(duration)
        };

        Self {
            deadline,
            registered: false,
        }
    }

    /// Returns `true` once the deadline is reached.
    pub fn is_elapsed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.is_elapsed() {
            return Poll::Ready(());
        }

        if !this.registered {
            this.registered = true;

            let task = context::current_task().expect("Delay polled outside of a task");
            let remaining = match this.deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };

            task.reschedule(remaining);
        }

        Poll::Pending
    }
}
