// ABOUTME: Engine error types: thiserror EngineError and the SNAFU RuntimeError.
// ABOUTME: Covers opening streaming requests, HTTP status failures and detection.

use snafu::Snafu;
use std::time::Duration;

use super::detection::DetectionError;
use crate::stream::StreamError;

/// Errors from talking to the engine API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: String,
        source: std::io::Error,
    },

    #[error("HTTP handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("failed to build request: {0}")]
    InvalidRequest(String),

    #[error("engine did not respond within {0:?}")]
    ConnectTimeout(Duration),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("engine returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("engine API error: {0}")]
    Api(#[source] bollard::errors::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
}

impl EngineError {
    /// Error for a non-success response, taking the message from the JSON body if present.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());
        match status {
            404 => EngineError::NotFound(message),
            409 => EngineError::Conflict(message),
            _ => EngineError::Status { status, message },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(e: bollard::errors::Error) -> Self {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => EngineError::NotFound(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message,
            } => EngineError::Conflict(message),
            bollard::errors::Error::SocketNotFoundError(path) => EngineError::Connect {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "socket not found"),
                path,
            },
            e => EngineError::Api(e),
        }
    }
}

/// Unified error for detection and connection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: EngineError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No container runtime found on the system.
    NoRuntimeFound,
    /// DOCKER_HOST points at something other than a unix socket.
    UnsupportedHost,
    /// Failed to reach the engine socket.
    ConnectionFailed,
    /// The engine answered with an error.
    RuntimeOperation,
}

impl RuntimeError {
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection { source } => match source {
                DetectionError::NoRuntimeFound => RuntimeErrorKind::NoRuntimeFound,
                DetectionError::UnsupportedHost(_) => RuntimeErrorKind::UnsupportedHost,
            },
            RuntimeError::Connection { source } => match source {
                EngineError::Connect { .. }
                | EngineError::Handshake(_)
                | EngineError::ConnectTimeout(_) => RuntimeErrorKind::ConnectionFailed,
                _ => RuntimeErrorKind::RuntimeOperation,
            },
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<EngineError> for RuntimeError {
    fn from(source: EngineError) -> Self {
        RuntimeError::Connection { source }
    }
}
