//! Timed suspension.
//!
//! [`delay`] suspends the current task without blocking the thread it
//! runs on: the task is parked in the scheduling queue's delay set and
//! restarted once its deadline elapses.

mod delay;

#[doc(inline)]
pub use delay::{Delay, delay, delay_millis};
