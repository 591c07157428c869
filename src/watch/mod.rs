// src/watch/mod.rs

//! File watching for development sessions.
//!
//! Changes under `src` and `public` are matched against per-glob profiles.
//! A profile either re-runs one compile task or only asks connected browsers
//! to reload. Optional content hashing drops triggers for files that were
//! saved without changing.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{WatchContext, process_file_change};
pub use hash::{MemoryHashStore, compute_aggregate_hash, compute_file_hash};
pub use patterns::{WatchAction, WatchProfile, actions_for_path, build_profiles};
pub use watcher::{WatcherHandle, spawn_watcher};
