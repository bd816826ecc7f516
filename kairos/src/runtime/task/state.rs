//! Lifecycle states of a task's resumption machinery.
//!
//! The result slot decides whether a task is *completed*; these states only
//! decide who may poll the body and whether a resumption is already pending.

/// Not scheduled: either never started or suspended at an await/delay.
pub(crate) const IDLE: usize = 0;

/// A resumption step has been handed to the task's dispatcher.
pub(crate) const SCHEDULED: usize = 1;

/// The body is being polled. At most one thread observes this state.
pub(crate) const RUNNING: usize = 2;

/// Woken while running; the body is polled again once the current step
/// returns.
pub(crate) const NOTIFIED: usize = 3;

/// The body finished, panicked, or was dropped after cancellation.
pub(crate) const COMPLETED: usize = 4;
