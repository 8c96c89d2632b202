// ABOUTME: Pull-based reading of decoded items from a byte source.
// ABOUTME: Alternative to callbacks for consumers that prefer a futures Stream.

use futures::Stream;

use super::decoder::Decoder;
use super::error::{Result, StreamError};
use super::source::ByteSource;

enum ReadState<S> {
    Open(S),
    Ended,
    Failed,
}

/// Reads decoded items one at a time.
///
/// Unlike a session there is no deadline or cancel handle: the caller stops
/// reading by dropping the reader, which drops the source with it. After a
/// failure the source is released and every later call returns
/// [`StreamError::AlreadyFailed`].
pub struct FrameReader<S, D> {
    state: ReadState<S>,
    decoder: D,
}

impl<S: ByteSource, D: Decoder> FrameReader<S, D> {
    pub fn new(source: S, decoder: D) -> Self {
        Self {
            state: ReadState::Open(source),
            decoder,
        }
    }

    /// Next decoded item, `Ok(None)` once the source has ended cleanly.
    pub async fn next(&mut self) -> Result<Option<D::Item>> {
        let result = self.pull().await;
        if result.is_err() {
            self.state = ReadState::Failed;
        }
        result
    }

    async fn pull(&mut self) -> Result<Option<D::Item>> {
        loop {
            let source = match &mut self.state {
                ReadState::Failed => return Err(StreamError::AlreadyFailed),
                ReadState::Ended => return Ok(self.decoder.next_item()?),
                ReadState::Open(source) => source,
            };
            if let Some(item) = self.decoder.next_item()? {
                return Ok(Some(item));
            }
            match source.next_chunk().await {
                Ok(Some(chunk)) => self.decoder.feed(chunk),
                Ok(None) => {
                    self.state = ReadState::Ended;
                    self.decoder.finish()?;
                }
                Err(e) => return Err(StreamError::Connection(e)),
            }
        }
    }

    /// Turn the reader into a stream that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<D::Item>> {
        futures::stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::decoder::FrameDecoder;
    use crate::stream::error::DecodeError;
    use crate::stream::frame::StreamKind;
    use crate::stream::json::JsonDecoder;
    use crate::stream::source::StreamSource;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::io;

    fn source(chunks: Vec<&'static [u8]>) -> StreamSource<impl futures::Stream<Item = io::Result<Bytes>> + Unpin> {
        StreamSource::new(futures::stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    #[tokio::test]
    async fn reads_frames_then_ends() {
        let mut reader = FrameReader::new(
            source(vec![b"\x02\x00\x00\x00\x00\x00", b"\x00\x03err"]),
            FrameDecoder::multiplexed(),
        );

        let frame = reader.next().await.unwrap().unwrap();
        assert_eq!(frame.kind(), StreamKind::Error);
        assert_eq!(frame.payload().as_ref(), b"err");
        assert!(reader.next().await.unwrap().is_none());
        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_stops_after_error() {
        let reader = FrameReader::new(
            source(vec![b"\x01\x00\x00\x00\x00\x00\x00\x09short"]),
            FrameDecoder::multiplexed(),
        );

        let items: Vec<_> = reader.into_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(StreamError::Decode(DecodeError::TruncatedPayload { .. }))
        ));
    }

    #[tokio::test]
    async fn failure_is_not_reported_as_a_clean_end() {
        let mut reader = FrameReader::new(
            source(vec![b"\x01\x00\x00\x00\x00\x00\x00\x09short"]),
            FrameDecoder::multiplexed(),
        );

        assert!(matches!(
            reader.next().await,
            Err(StreamError::Decode(DecodeError::TruncatedPayload {
                expected: 9,
                received: 5
            }))
        ));
        assert!(matches!(
            reader.next().await,
            Err(StreamError::AlreadyFailed)
        ));
        assert!(matches!(
            reader.next().await,
            Err(StreamError::AlreadyFailed)
        ));
    }

    #[tokio::test]
    async fn json_values_as_stream() {
        let reader = FrameReader::new(
            source(vec![b"{\"n\":1}\n{\"n\"", b":2}\n"]),
            JsonDecoder::<serde_json::Value>::new(),
        );

        let values: Vec<_> = reader
            .into_stream()
            .map(|v| v.unwrap()["n"].as_u64().unwrap())
            .collect()
            .await;
        assert_eq!(values, vec![1, 2]);
    }
}
