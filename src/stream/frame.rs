// ABOUTME: Frame and multiplex header types for engine output streams.
// ABOUTME: Encodes and decodes the 8-byte stdcopy header used by attach, logs and exec.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use super::error::DecodeError;

/// Size of the multiplex header preceding every payload.
pub const HEADER_SIZE: usize = 8;

/// Logical stream a frame belongs to.
///
/// `Input`, `Output`, `Error` and `SystemError` only appear on multiplexed
/// streams. `Raw` is the single kind of a TTY stream, where the engine sends
/// the pseudo-terminal output without any framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Input,
    Output,
    Error,
    /// Out-of-band error text written by the engine itself.
    SystemError,
    Raw,
}

impl StreamKind {
    /// Wire id of a multiplexed kind. `Raw` has no wire representation.
    pub fn id(self) -> Option<u8> {
        match self {
            StreamKind::Input => Some(0),
            StreamKind::Output => Some(1),
            StreamKind::Error => Some(2),
            StreamKind::SystemError => Some(3),
            StreamKind::Raw => None,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, DecodeError> {
        match id {
            0 => Ok(StreamKind::Input),
            1 => Ok(StreamKind::Output),
            2 => Ok(StreamKind::Error),
            3 => Ok(StreamKind::SystemError),
            other => Err(DecodeError::UnknownStreamKind(other)),
        }
    }

    /// Whether a terminal would show this kind on stderr.
    pub fn is_error(self) -> bool {
        matches!(self, StreamKind::Error | StreamKind::SystemError)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Input => write!(f, "stdin"),
            StreamKind::Output => write!(f, "stdout"),
            StreamKind::Error => write!(f, "stderr"),
            StreamKind::SystemError => write!(f, "systemerr"),
            StreamKind::Raw => write!(f, "raw"),
        }
    }
}

/// One decoded unit of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: StreamKind,
    payload: Bytes,
}

impl Frame {
    pub fn new(kind: StreamKind, payload: Bytes) -> Self {
        Self { kind, payload }
    }

    pub fn raw(payload: Bytes) -> Self {
        Self::new(StreamKind::Raw, payload)
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload as lossy UTF-8 with trailing whitespace removed.
    pub fn payload_as_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).trim_end().to_string()
    }

    /// Encode this frame with its multiplex header.
    ///
    /// Returns `None` for `Raw` frames, which are never framed on the wire.
    pub fn encode(&self) -> Option<Bytes> {
        let id = self.kind.id()?;
        let length = u32::try_from(self.payload.len()).ok()?;
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&MultiplexHeader { id, length }.encode());
        buf.put_slice(&self.payload);
        Some(buf.freeze())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame{{kind={}, payload={}}}", self.kind, self.payload_as_str())
    }
}

/// The 8-byte header that precedes each multiplexed payload.
///
/// Layout: `[kind, 0, 0, 0, len_be_0, len_be_1, len_be_2, len_be_3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexHeader {
    pub id: u8,
    pub length: u32,
}

impl MultiplexHeader {
    /// Parse a header. The three reserved bytes are ignored.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            id: bytes[0],
            length: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = self.length.to_be_bytes();
        [self.id, 0, 0, 0, len[0], len[1], len[2], len[3]]
    }

    pub fn kind(&self) -> Result<StreamKind, DecodeError> {
        StreamKind::from_id(self.id)
    }
}
