//! Tasks: the schedulable, awaitable units of the runtime.
//!
//! A task wraps a `Send + 'static` future. It owns a write-once result
//! slot, an ordered list of completion callbacks, and a resumption state
//! machine that guarantees the body is never polled concurrently.
//!
//! Tasks are created through a [`Scope`](crate::Scope); the handles
//! returned here are used to await, join and cancel them.

mod all;
mod handle;
mod id;
mod join;
mod state;
mod waker;

pub(crate) mod core;

pub(crate) use self::core::{Runnable, TaskRef};

pub use all::await_all;
pub use handle::Task;
pub use id::TaskId;
pub use join::Join;
