//! Error taxonomy for a plot attempt.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Every variant is terminal for the current attempt. Nothing in this crate retries.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("temporary file error: {message}")]
    TempFile {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("interpreter did not produce {artifact} at {}", .path.display())]
    ExecutionFailure { artifact: &'static str, path: PathBuf },

    #[error("failed to persist {} into internal storage: {source}", .target.display())]
    Persistence {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("overwrite is disabled but output file '{}' already exists", .path.display())]
    Conflict { path: PathBuf },

    #[error("failed to load node internals from {}: {reason}", .dir.display())]
    CorruptInternals { dir: PathBuf, reason: String },

    #[error("interpreter failed: {0}")]
    Interpreter(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write output file '{}': {source}", .path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("execution cancelled")]
    Cancelled,
}

impl PlotError {
    pub fn temp_file(message: impl Into<String>, source: io::Error) -> Self {
        Self::TempFile { message: message.into(), source: Some(source) }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;
