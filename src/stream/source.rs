// ABOUTME: Byte sources a streaming session reads from.
// ABOUTME: Wraps hyper response bodies, futures streams and async readers.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// A connection body read one chunk at a time.
///
/// `Ok(Some(chunk))` is data, `Ok(None)` is a clean end of data, `Err` is a
/// transport failure. Dropping the source releases the connection.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

#[async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        (**self).next_chunk().await
    }
}

/// Response body of a streaming request on a dedicated HTTP connection.
///
/// Owns the task driving the connection and aborts it on drop, so the socket
/// is closed as soon as the session lets go of the body.
pub struct BodySource {
    body: Incoming,
    connection: Option<JoinHandle<()>>,
}

impl BodySource {
    pub fn new(body: Incoming, connection: JoinHandle<()>) -> Self {
        Self {
            body,
            connection: Some(connection),
        }
    }
}

#[async_trait]
impl ByteSource for BodySource {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            match self.body.frame().await {
                Some(Ok(frame)) => {
                    // Trailers carry no stream data.
                    if let Ok(data) = frame.into_data() {
                        return Ok(Some(data));
                    }
                }
                Some(Err(e)) => return Err(io::Error::other(e)),
                None => return Ok(None),
            }
        }
    }
}

impl Drop for BodySource {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }
}

/// Adapts a `Stream` of byte chunks, e.g. a channel receiver or bollard output.
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S, E> ByteSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(io::Error::other(e)),
            None => Ok(None),
        }
    }
}

/// Reads chunks of up to `capacity` bytes from an async reader.
///
/// Used for hijacked connections, where the engine takes over the socket
/// after the response head.
pub struct ReaderSource<R> {
    reader: R,
    capacity: usize,
}

impl<R> ReaderSource<R> {
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Send + Unpin> ByteSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(self.capacity);
        let n = self.reader.read_buf(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }
}
