// src/dag/mod.rs

//! Task DAG and per-run scheduling.
//!
//! - [`graph`] holds deps/dependents adjacency built from a lowered pipeline.
//! - [`scheduler`] is the per-run state machine deciding which tasks are ready.
//! - [`state_manager`] implements the state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
