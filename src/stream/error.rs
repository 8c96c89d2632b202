// ABOUTME: Error types for stream decoding and streaming sessions.
// ABOUTME: Wire-format violations, connection failures and callback failures.

use thiserror::Error;

/// Error a consumer callback returns to abort the session.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Violations of the stream wire format.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stream closed after {received} of 8 header bytes")]
    ShortHeader { received: usize },

    #[error("unknown stream kind id {0}")]
    UnknownStreamKind(u8),

    #[error("stream closed after {received} of {expected} payload bytes")]
    TruncatedPayload { expected: u32, received: usize },

    #[error("frame payload of {length} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { length: u32, limit: u32 },

    #[error("invalid JSON in stream: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stream closed inside a JSON value ({pending} bytes pending)")]
    TruncatedJson { pending: usize },
}

/// Errors that fail a streaming session.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("callback failed: {0}")]
    Callback(CallbackError),

    #[error("session task aborted")]
    Aborted,

    #[error("stream already failed")]
    AlreadyFailed,
}

impl StreamError {
    /// Whether the engine sent bytes that do not follow the wire format.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
