use super::core::TaskRef;
use super::waker::WakerSlot;
use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future returned by [`Task::join`](super::Task::join).
///
/// Resolves once the task reaches a terminal state. Cancellation resolves
/// to `Ok(())`; a failure resolves to the stored error.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Join {
    task: TaskRef,
    waiter: Option<Arc<WakerSlot>>,
}

impl Join {
    pub(crate) fn new(task: TaskRef) -> Self {
        Self { task, waiter: None }
    }

    fn ready(&self) -> Option<Result<(), TaskError>> {
        self.task.status().map(|status| match status {
            Err(TaskError::Canceled(_)) => Ok(()),
            other => other,
        })
    }
}

impl Future for Join {
    type Output = Result<(), TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(result) = this.ready() {
            return Poll::Ready(result);
        }

        match &this.waiter {
            Some(waiter) => waiter.update(cx.waker()),
            None => {
                let waiter = Arc::new(WakerSlot::new(cx.waker()));
                let slot = waiter.clone();
                this.task.on_completion(Box::new(move |_| slot.wake()));
                this.waiter = Some(waiter);
            }
        }

        match this.ready() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join").field("task", &self.task.id()).finish()
    }
}
