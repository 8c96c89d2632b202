// ABOUTME: Application-wide error types for dockstream.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::runtime::{EngineError, RuntimeError};
use crate::stream::StreamError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("stream timed out after {0}")]
    TimedOut(String),

    #[error("command exited with status {0}")]
    ExitStatus(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
