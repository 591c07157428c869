// src/errors.rs

//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{task} failed on {path:?}: {message}")]
    Transform {
        task: String,
        path: PathBuf,
        message: String,
    },

    #[error("Invalid pipeline: {0}")]
    Pipeline(String),

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("tasks failed: {}", .0.join(", "))]
    TaskFailed(Vec<String>),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PagesError {
    pub fn transform(task: impl Into<String>, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PagesError::Transform {
            task: task.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PagesError>;
