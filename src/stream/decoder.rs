// ABOUTME: Incremental decoders turning byte chunks into stream items.
// ABOUTME: FrameDecoder handles multiplexed and raw (TTY) engine output.

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

use super::error::DecodeError;
use super::frame::{Frame, HEADER_SIZE, MultiplexHeader, StreamKind};

/// Largest payload accepted by default (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: u32 = 64 * 1024 * 1024;

/// Multiplexed stream content type announced by newer engines.
pub const MULTIPLEXED_CONTENT_TYPE: &str = "application/vnd.docker.multiplexed-stream";

/// Raw stream content type. Used for both TTY and non-TTY output by older engines.
pub const RAW_CONTENT_TYPE: &str = "application/vnd.docker.raw-stream";

/// Decoding strategy plugged into a streaming session.
///
/// The session feeds every chunk read from the connection, drains complete
/// items with `next_item`, and calls `finish` once the source reports a clean
/// end of data.
pub trait Decoder: Send {
    type Item: Send;

    /// Hand the next chunk read from the source to the decoder.
    fn feed(&mut self, chunk: Bytes);

    /// Take the next complete item, or `None` if more bytes are needed.
    fn next_item(&mut self) -> Result<Option<Self::Item>, DecodeError>;

    /// Check that the source ended on an item boundary.
    fn finish(&mut self) -> Result<(), DecodeError>;
}

/// How output on a connection is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// 8-byte header per payload, stdout and stderr interleaved.
    Multiplexed,
    /// Unframed bytes from a pseudo-terminal.
    Raw,
}

impl FramingMode {
    /// Framing of a target created with or without a TTY.
    pub fn for_tty(tty: bool) -> Self {
        if tty {
            FramingMode::Raw
        } else {
            FramingMode::Multiplexed
        }
    }

    /// Resolve framing from the response content type, falling back to the TTY flag.
    ///
    /// Only the multiplexed content type is conclusive: engines reply with the
    /// raw content type (or none at all) for both kinds of stream.
    pub fn resolve(content_type: Option<&str>, tty: bool) -> Self {
        let media_type = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match media_type.as_deref() {
            Some(MULTIPLEXED_CONTENT_TYPE) => FramingMode::Multiplexed,
            _ => Self::for_tty(tty),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Header,
    Payload { kind: StreamKind, length: u32 },
}

/// Decoder for attach, logs and exec output.
pub struct FrameDecoder {
    mode: FramingMode,
    buffer: BytesMut,
    state: State,
    chunks: VecDeque<Bytes>,
    max_payload: u32,
}

impl FrameDecoder {
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            buffer: BytesMut::new(),
            state: State::Header,
            chunks: VecDeque::new(),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub fn multiplexed() -> Self {
        Self::new(FramingMode::Multiplexed)
    }

    pub fn raw() -> Self {
        Self::new(FramingMode::Raw)
    }

    /// Reject declared payload lengths above `limit`.
    pub fn with_max_payload(mut self, limit: u32) -> Self {
        self.max_payload = limit;
        self
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    fn next_multiplexed(&mut self) -> Result<Option<Frame>, DecodeError> {
        loop {
            match self.state {
                State::Header => {
                    if self.buffer.len() < HEADER_SIZE {
                        return Ok(None);
                    }
                    let mut raw = [0u8; HEADER_SIZE];
                    raw.copy_from_slice(&self.buffer[..HEADER_SIZE]);
                    let header = MultiplexHeader::decode(&raw);
                    let kind = header.kind()?;
                    if header.length > self.max_payload {
                        return Err(DecodeError::PayloadTooLarge {
                            length: header.length,
                            limit: self.max_payload,
                        });
                    }
                    self.buffer.advance(HEADER_SIZE);
                    self.state = State::Payload {
                        kind,
                        length: header.length,
                    };
                }
                State::Payload { kind, length } => {
                    let length = length as usize;
                    if self.buffer.len() < length {
                        self.buffer.reserve(length - self.buffer.len());
                        return Ok(None);
                    }
                    let payload = self.buffer.split_to(length).freeze();
                    self.state = State::Header;
                    return Ok(Some(Frame::new(kind, payload)));
                }
            }
        }
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;

    fn feed(&mut self, chunk: Bytes) {
        match self.mode {
            FramingMode::Multiplexed => self.buffer.extend_from_slice(&chunk),
            FramingMode::Raw => self.chunks.push_back(chunk),
        }
    }

    fn next_item(&mut self) -> Result<Option<Frame>, DecodeError> {
        match self.mode {
            FramingMode::Multiplexed => self.next_multiplexed(),
            FramingMode::Raw => Ok(self.chunks.pop_front().map(Frame::raw)),
        }
    }

    fn finish(&mut self) -> Result<(), DecodeError> {
        if self.mode == FramingMode::Raw {
            return Ok(());
        }
        match self.state {
            State::Header if self.buffer.is_empty() => Ok(()),
            State::Header => Err(DecodeError::ShortHeader {
                received: self.buffer.len(),
            }),
            State::Payload { length, .. } => Err(DecodeError::TruncatedPayload {
                expected: length,
                received: self.buffer.len(),
            }),
        }
    }
}
