// ABOUTME: Streaming session driving a decoder over a byte source.
// ABOUTME: Runs the read loop on its own task and enforces one terminal outcome.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::callback::StreamCallback;
use super::cancel::{CancelHandle, CancelReason, SessionState};
use super::decoder::Decoder;
use super::error::{Result, StreamError};
use super::source::ByteSource;

/// Deadline used when the timeout is too large to represent.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stream ended cleanly and `on_finished` ran.
    Finished,
    /// The session failed and `on_failed` handled the error.
    Failed,
    /// The cancel handle or the deadline stopped the session.
    Cancelled(CancelReason),
}

/// Owns the connection for the lifetime of a session and releases it exactly once.
struct Connection<S> {
    source: Option<S>,
    handle: CancelHandle,
    label: String,
}

impl<S: ByteSource> Connection<S> {
    fn new(source: S, handle: CancelHandle, label: String) -> Self {
        Self {
            source: Some(source),
            handle,
            label,
        }
    }

    async fn next_chunk(&mut self) -> std::io::Result<Option<bytes::Bytes>> {
        match self.source.as_mut() {
            Some(source) => source.next_chunk().await,
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            tracing::debug!(session = %self.label, "stream connection released");
        }
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        if self.source.take().is_some() {
            self.handle.abandon();
            tracing::debug!(session = %self.label, "stream connection released on unwind");
        }
    }
}

enum Drive {
    Finished,
    Failed(StreamError),
    Cancelled,
}

/// One attach, logs, exec or stats stream.
///
/// The session reads chunks from its source, feeds them to the decoder and
/// hands every decoded item to the callback, until the source ends, an error
/// occurs, or the session is cancelled. The connection is dropped as soon as
/// a terminal state is reached, before the terminal callback runs.
pub struct StreamingSession<S, D> {
    source: S,
    decoder: D,
    timeout: Duration,
    handle: CancelHandle,
    label: String,
}

impl<S, D> StreamingSession<S, D>
where
    S: ByteSource + 'static,
    D: Decoder + 'static,
    D::Item: 'static,
{
    /// Create a session that is cancelled if it runs longer than `timeout`.
    pub fn new(source: S, decoder: D, timeout: Duration) -> Self {
        Self {
            source,
            decoder,
            timeout,
            handle: CancelHandle::new(),
            label: String::from("stream"),
        }
    }

    /// Name used in log output.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Handle to the session's state, also passed to `on_starting`.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Run the read loop on a new task.
    pub fn spawn<C>(self, callback: C) -> SessionHandle
    where
        C: StreamCallback<D::Item> + 'static,
    {
        let cancel = self.handle.clone();
        let join = tokio::spawn(self.run(callback));
        SessionHandle { join, cancel }
    }

    /// Run the read loop on the current task until a terminal state.
    ///
    /// Returns `Err` only when `on_failed` propagates an error.
    pub async fn run<C>(self, mut callback: C) -> Result<Outcome>
    where
        C: StreamCallback<D::Item>,
    {
        let Self {
            source,
            mut decoder,
            timeout,
            handle,
            label,
        } = self;

        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
        let mut connection = Connection::new(source, handle.clone(), label.clone());

        callback.on_starting(handle.clone());
        if !handle.activate() {
            connection.release();
            return Ok(Outcome::Cancelled(cancel_reason(&handle)));
        }
        tracing::debug!(session = %label, ?timeout, "stream session active");

        let drive = drive(
            &mut connection,
            &mut decoder,
            &mut callback,
            &handle,
            deadline,
        )
        .await;

        match drive {
            Drive::Finished if handle.complete(SessionState::Finished) => {
                connection.release();
                tracing::debug!(session = %label, "stream finished");
                callback.on_finished();
                Ok(Outcome::Finished)
            }
            Drive::Failed(error) if handle.complete(SessionState::Failed) => {
                connection.release();
                tracing::debug!(session = %label, %error, "stream failed");
                callback.on_failed(error)?;
                Ok(Outcome::Failed)
            }
            _ => {
                connection.release();
                let reason = cancel_reason(&handle);
                tracing::debug!(session = %label, %reason, "stream cancelled");
                Ok(Outcome::Cancelled(reason))
            }
        }
    }
}

fn cancel_reason(handle: &CancelHandle) -> CancelReason {
    match handle.state() {
        SessionState::Cancelled(reason) => reason,
        _ => CancelReason::Requested,
    }
}

async fn drive<S, D, C>(
    connection: &mut Connection<S>,
    decoder: &mut D,
    callback: &mut C,
    handle: &CancelHandle,
    deadline: Instant,
) -> Drive
where
    S: ByteSource,
    D: Decoder,
    C: StreamCallback<D::Item>,
{
    loop {
        // Deliver everything decodable before reading again.
        loop {
            if handle.is_cancelled() {
                return Drive::Cancelled;
            }
            if Instant::now() >= deadline {
                handle.cancel_with(CancelReason::DeadlineElapsed);
                return Drive::Cancelled;
            }
            match decoder.next_item() {
                Ok(Some(item)) => {
                    if let Err(e) = callback.on_next(item) {
                        return Drive::Failed(StreamError::Callback(e));
                    }
                }
                Ok(None) => break,
                Err(e) => return Drive::Failed(e.into()),
            }
        }

        let chunk = tokio::select! {
            biased;
            _ = handle.cancelled() => return Drive::Cancelled,
            _ = tokio::time::sleep_until(deadline) => {
                handle.cancel_with(CancelReason::DeadlineElapsed);
                return Drive::Cancelled;
            }
            chunk = connection.next_chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => decoder.feed(bytes),
            Ok(None) => {
                return match decoder.finish() {
                    Ok(()) => Drive::Finished,
                    Err(e) => Drive::Failed(e.into()),
                };
            }
            Err(e) => return Drive::Failed(StreamError::Connection(e)),
        }
    }
}

/// A session running on its own task.
pub struct SessionHandle {
    join: JoinHandle<Result<Outcome>>,
    cancel: CancelHandle,
}

impl SessionHandle {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the session to reach a terminal state.
    ///
    /// A panic inside a callback is resumed on the waiting task.
    pub async fn wait(self) -> Result<Outcome> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(StreamError::Aborted),
        }
    }

    /// Let the session run to completion without waiting for it.
    ///
    /// Errors propagated by `on_failed` are logged.
    pub fn detach(self) {
        tokio::spawn(async move {
            if let Ok(Err(e)) = self.join.await {
                tracing::error!("detached stream session failed: {}", e);
            }
        });
    }
}
