// ABOUTME: Decoder for streams of concatenated JSON documents.
// ABOUTME: Used by stats, where the engine writes one JSON object per sample.

use bytes::{Buf, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use super::decoder::{DEFAULT_MAX_PAYLOAD, Decoder};
use super::error::DecodeError;

/// Decodes a sequence of JSON values separated by optional whitespace.
///
/// An unfinished value may hold at most `max_pending` bytes.
pub struct JsonDecoder<T> {
    buffer: BytesMut,
    max_pending: u32,
    // Buffer ends inside a value; nothing to parse until the next feed.
    incomplete: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            max_pending: DEFAULT_MAX_PAYLOAD,
            incomplete: false,
            _marker: PhantomData,
        }
    }

    /// Reject a value still unfinished after `limit` bytes.
    pub fn with_max_payload(mut self, limit: u32) -> Self {
        self.max_pending = limit;
        self
    }

    fn skip_whitespace(&mut self) {
        let leading = self
            .buffer
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buffer.advance(leading);
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send> Decoder for JsonDecoder<T> {
    type Item = T;

    fn feed(&mut self, chunk: Bytes) {
        self.buffer.extend_from_slice(&chunk);
        self.incomplete = false;
    }

    fn next_item(&mut self) -> Result<Option<T>, DecodeError> {
        self.skip_whitespace();
        if self.buffer.is_empty() || self.incomplete {
            return Ok(None);
        }

        let (next, consumed) = {
            let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<T>();
            let next = values.next();
            (next, values.byte_offset())
        };
        match next {
            Some(Ok(value)) => {
                self.buffer.advance(consumed);
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => {
                let pending = u32::try_from(self.buffer.len()).unwrap_or(u32::MAX);
                if pending > self.max_pending {
                    return Err(DecodeError::PayloadTooLarge {
                        length: pending,
                        limit: self.max_pending,
                    });
                }
                self.incomplete = true;
                Ok(None)
            }
            Some(Err(e)) => Err(DecodeError::Json(e)),
            None => Ok(None),
        }
    }

    fn finish(&mut self) -> Result<(), DecodeError> {
        self.skip_whitespace();
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TruncatedJson {
                pending: self.buffer.len(),
            })
        }
    }
}
