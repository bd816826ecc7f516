//! # Kairos
//!
//! **Kairos** is a minimal async task runtime: many logically concurrent
//! tasks multiplexed over a handful of OS threads, with timed suspension,
//! structured grouping and cancellation, and a blocking bridge for
//! ordinary code.
//!
//! The runtime is built from a small set of parts:
//!
//! - **Dispatchers** decide which thread runs a task: inline on the
//!   resuming thread, a compute pool sized to the CPU count, or an IO pool
//!   of at least 64 threads
//! - **Tasks** wrap a future with a write-once result, completion callbacks
//!   and cooperative cancellation
//! - A **scheduling queue** keeps ready tasks in FIFO order and delayed
//!   tasks ordered by deadline, and an **event loop** drives it from a
//!   single thread
//! - A **scope** tracks the tasks launched through it, and can cancel or
//!   join them as a group
//!
//! One failing task stops the whole loop: the failure is returned by
//! [`run_blocking`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kairos::time::delay;
//! use std::time::Duration;
//!
//! #[kairos::main]
//! async fn main(scope: kairos::Scope) {
//!     let hello = scope.launch(async {
//!         delay(Duration::from_millis(100)).await;
//!         "Hello"
//!     });
//!     let world = scope.launch(async { "World" });
//!
//!     let words = kairos::await_all([hello, world]).await.unwrap();
//!     println!("{}", words.join(" "));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Task handles, joining and `await_all`
//! - [`time`]: Delays

mod dispatcher;
mod error;
mod runtime;

pub mod time;

pub use dispatcher::{Dispatcher, Dispatchers};
pub use error::{Error, Result, TaskError};
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::task::{Task, TaskId, await_all};
pub use runtime::yield_now::yield_now;
pub use runtime::{Runtime, Scope, run_blocking};
pub use time::{delay, delay_millis};

pub use kairos_macros::{main, test};
