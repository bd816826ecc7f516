use crate::dispatcher::Dispatcher;
use crate::error::TaskError;
use crate::runtime::task::core::Core;
use crate::runtime::task::{Task, TaskRef};

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A task waiting in the delay set.
struct DelayedEntry {
    /// Monotonic instant at which the task becomes ready.
    deadline: Instant,

    /// Insertion order, breaks ties between equal deadlines.
    sequence: u64,

    task: TaskRef,
}

impl Eq for DelayedEntry {}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for DelayedEntry {
    /// Orders entries by deadline, then by insertion.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<DelayedEntry>`
    /// pops the earliest deadline first, and among equal deadlines the
    /// entry inserted first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct QueueState {
    ready: VecDeque<TaskRef>,
    delayed: BinaryHeap<DelayedEntry>,
    sequence: u64,
    stopped: bool,
}

/// The scheduling queue driven by an [`EventLoop`](super::EventLoop).
///
/// Holds a FIFO of ready tasks and a deadline-ordered set of delayed
/// tasks. Producers (launches, delay requests, re-polls) may run on any
/// thread; [`poll`](Self::poll) is only called by the event loop thread,
/// which parks on the condition variable while nothing is due.
///
/// Every mutation is made under the state lock together with the matching
/// wake signal, so the poller never misses a new, sooner task.
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    condvar: Condvar,

    /// First task failure observed; stops the queue.
    failure: Mutex<Option<TaskError>>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                delayed: BinaryHeap::new(),
                sequence: 0,
                stopped: false,
            }),
            condvar: Condvar::new(),
            failure: Mutex::new(None),
        }
    }

    /// Creates a task bound to `dispatcher` and enqueues it.
    ///
    /// The task reports a failure to this queue, which stops polling: one
    /// failing task tears down the whole loop.
    pub(crate) fn spawn<F, T>(self: &Arc<Self>, dispatcher: Dispatcher, future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let task = Task::new(Arc::new(Core::new(future, dispatcher, Arc::downgrade(self))));

        let queue = Arc::downgrade(self);
        task.on_completion(move |err| {
            if let Some(err @ TaskError::Failed { .. }) = err {
                if let Some(queue) = queue.upgrade() {
                    queue.fail(err.clone());
                }
            }
        });

        self.enqueue(task.as_task_ref());
        task
    }

    /// Appends `task` to the ready queue and wakes the poller.
    pub(crate) fn enqueue(&self, task: TaskRef) {
        tracing::trace!(task.id = %task.id(), "task ready");

        let mut state = self.state.lock();
        state.ready.push_back(task);
        self.condvar.notify_one();
    }

    /// Makes `task` ready once `delay` has elapsed.
    ///
    /// A zero delay is the same as [`enqueue`](Self::enqueue). A deadline
    /// that cannot be represented is never reached, so nothing is stored.
    pub(crate) fn enqueue_delayed(&self, task: TaskRef, delay: Duration) {
        if delay.is_zero() {
            self.enqueue(task);
            return;
        }

        let Some(deadline) = Instant::now().checked_add(delay) else {
            tracing::trace!(task.id = %task.id(), ?delay, "delay never elapses");
            return;
        };

        tracing::trace!(task.id = %task.id(), ?delay, "task delayed");

        let mut state = self.state.lock();
        let sequence = state.sequence;
        state.sequence += 1;
        state.delayed.push(DelayedEntry {
            deadline,
            sequence,
            task,
        });
        self.condvar.notify_one();
    }

    /// Returns the next task to start, parking while none is due.
    ///
    /// Ready tasks come first, in enqueue order. Otherwise the thread waits
    /// for the nearest deadline, or indefinitely if the delay set is empty,
    /// and re-evaluates after every wake-up. Delayed entries of completed
    /// tasks are dropped when they reach the head of the set.
    ///
    /// Returns `None` once [`stop_polling`](Self::stop_polling) was called.
    pub(crate) fn poll(&self) -> Option<TaskRef> {
        let mut state = self.state.lock();

        loop {
            if state.stopped {
                return None;
            }

            if let Some(task) = state.ready.pop_front() {
                return Some(task);
            }

            while state
                .delayed
                .peek()
                .is_some_and(|entry| entry.task.is_completed())
            {
                state.delayed.pop();
            }

            match state.delayed.peek().map(|entry| entry.deadline) {
                None => self.condvar.wait(&mut state),
                Some(deadline) if Instant::now() >= deadline => {
                    if let Some(entry) = state.delayed.pop() {
                        tracing::trace!(task.id = %entry.task.id(), "delay elapsed");
                        return Some(entry.task);
                    }
                }
                Some(deadline) => {
                    self.condvar.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Stops the queue; [`poll`](Self::poll) returns `None` from now on.
    pub(crate) fn stop_polling(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        self.condvar.notify_all();
    }

    /// Wakes the poller so it re-evaluates the delay set.
    pub(crate) fn notify(&self) {
        let _state = self.state.lock();
        self.condvar.notify_all();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Records a task failure and stops the queue. The first failure wins.
    pub(crate) fn fail(&self, err: TaskError) {
        {
            let mut failure = self.failure.lock();
            if failure.is_some() {
                return;
            }
            tracing::error!(error = %err, "task failure stops the event loop");
            *failure = Some(err);
        }

        self.stop_polling();
    }

    pub(crate) fn take_failure(&self) -> Option<TaskError> {
        self.failure.lock().take()
    }

    /// Drops every pending task reference.
    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.ready.clear();
        state.delayed.clear();
    }

    #[cfg(test)]
    fn len(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.ready.len(), state.delayed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    fn task(queue: &Arc<TaskQueue>) -> Task<()> {
        queue.spawn(Dispatcher::unconfined(), async {})
    }

    #[test]
    fn ready_tasks_come_out_in_fifo_order() {
        let queue = Arc::new(TaskQueue::new());
        let ids: Vec<_> = (0..3).map(|_| task(&queue).id()).collect();

        let polled: Vec<_> = (0..3).map(|_| queue.poll().unwrap().id()).collect();
        assert_eq!(polled, ids);
    }

    #[test]
    fn delayed_tasks_come_out_by_deadline() {
        let queue = Arc::new(TaskQueue::new());
        let late = task(&queue);
        let early = task(&queue);
        queue.clear();

        queue.enqueue_delayed(late.as_task_ref(), Duration::from_millis(60));
        queue.enqueue_delayed(early.as_task_ref(), Duration::from_millis(20));

        let start = Instant::now();
        assert_eq!(queue.poll().unwrap().id(), early.id());
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(queue.poll().unwrap().id(), late.id());
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let first = DelayedEntry {
            deadline: Instant::now(),
            sequence: 0,
            task: Arc::new(Core::new(async {}, Dispatcher::unconfined(), Default::default())),
        };
        let second = DelayedEntry {
            deadline: first.deadline,
            sequence: 1,
            task: first.task.clone(),
        };

        let mut heap = BinaryHeap::new();
        heap.push(second);
        heap.push(first);

        assert_eq!(heap.pop().map(|entry| entry.sequence), Some(0));
        assert_eq!(heap.pop().map(|entry| entry.sequence), Some(1));
    }

    #[test]
    fn zero_delay_is_immediately_ready() {
        let queue = Arc::new(TaskQueue::new());
        let task = task(&queue);
        queue.clear();

        queue.enqueue_delayed(task.as_task_ref(), Duration::ZERO);
        assert_eq!(queue.len(), (1, 0));
    }

    #[test]
    fn unreachable_deadline_is_not_stored() {
        let queue = Arc::new(TaskQueue::new());
        let task = task(&queue);
        queue.clear();

        queue.enqueue_delayed(task.as_task_ref(), Duration::MAX);
        assert_eq!(queue.len(), (0, 0));
    }

    #[test]
    fn enqueue_wakes_a_parked_poller() {
        let queue = Arc::new(TaskQueue::new());
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            task(&producer).id()
        });

        let polled = queue.poll().unwrap().id();
        assert_eq!(polled, handle.join().unwrap());
    }

    #[test]
    fn stop_polling_releases_the_poller() {
        let queue = Arc::new(TaskQueue::new());
        let stopper = queue.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.stop_polling();
        });

        assert!(queue.poll().is_none());
        assert!(queue.is_stopped());
        handle.join().unwrap();
    }

    #[test]
    fn canceled_delayed_task_is_discarded() {
        let queue = Arc::new(TaskQueue::new());
        let canceled = task(&queue);
        let next = task(&queue);
        queue.clear();

        queue.enqueue_delayed(canceled.as_task_ref(), Duration::from_secs(60));
        queue.enqueue_delayed(next.as_task_ref(), Duration::from_millis(10));
        canceled.cancel();

        let start = Instant::now();
        assert_eq!(queue.poll().unwrap().id(), next.id());
        assert!(start.elapsed() < Duration::from_secs(1));

        let stopper = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.stop_polling();
        });
        assert!(queue.poll().is_none());
        assert_eq!(queue.len(), (0, 0));
        handle.join().unwrap();
    }

    #[test]
    fn first_failure_wins_and_stops_the_queue() {
        let queue = Arc::new(TaskQueue::new());
        let first = task(&queue).id();
        let second = task(&queue).id();

        let failed = |task| TaskError::Failed {
            task,
            message: "boom".to_owned(),
        };
        queue.fail(failed(first));
        queue.fail(failed(second));

        assert!(queue.is_stopped());
        assert_eq!(queue.take_failure(), Some(failed(first)));
        assert_eq!(queue.take_failure(), None);
    }
}
