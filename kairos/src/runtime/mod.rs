//! Core runtime components.
//!
//! This module contains the scheduling machinery of the runtime: tasks,
//! the ready/delay queue, the event loop that drives it, scopes and the
//! blocking entry point.
//!
//! A [`Runtime::run_blocking`] call creates one queue and one event loop,
//! drives the loop on the calling thread and hands the root computation a
//! [`Scope`] to launch tasks through.

mod core;
mod event_loop;
mod queue;
mod scope;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::{Runtime, run_blocking};
pub use scope::Scope;
