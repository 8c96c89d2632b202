// ABOUTME: Streaming transport for long-lived engine responses.
// ABOUTME: Frame codec, byte sources, sessions, cancellation and callbacks.

mod callback;
mod cancel;
mod decoder;
mod error;
mod frame;
mod json;
mod reader;
mod session;
mod source;

pub use callback::{Handlers, StreamCallback};
pub use cancel::{CancelHandle, CancelReason, SessionState};
pub use decoder::{
    DEFAULT_MAX_PAYLOAD, Decoder, FrameDecoder, FramingMode, MULTIPLEXED_CONTENT_TYPE,
    RAW_CONTENT_TYPE,
};
pub use error::{CallbackError, DecodeError, Result, StreamError};
pub use frame::{Frame, HEADER_SIZE, MultiplexHeader, StreamKind};
pub use json::JsonDecoder;
pub use reader::FrameReader;
pub use session::{Outcome, SessionHandle, StreamingSession};
pub use source::{BodySource, ByteSource, ReaderSource, StreamSource};
