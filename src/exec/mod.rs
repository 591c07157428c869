// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests replace it with a fake.
//! - [`executor_loop`] receives scheduled tasks and spawns one runner each.
//! - [`task_runner`] runs a task on the blocking pool and reports completion.
//! - [`command`] pipes file contents through external `[tools]` commands.

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
