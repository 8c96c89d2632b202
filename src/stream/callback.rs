// ABOUTME: Consumer-facing callback contract for streaming sessions.
// ABOUTME: StreamCallback trait plus a closure-based Handlers implementation.

use super::cancel::CancelHandle;
use super::error::{CallbackError, StreamError};

/// Receives the events of one streaming session.
///
/// All methods run sequentially on the session's task, so an implementation
/// can keep mutable per-session state without locking.
///
/// Order of calls: `on_starting` exactly once, then `on_next` per decoded
/// item in wire order, then at most one of `on_finished` / `on_failed`.
/// A cancelled session (by the handle or by its deadline) gets neither.
pub trait StreamCallback<T>: Send {
    /// Called before any item, with the handle that stops the session.
    fn on_starting(&mut self, cancel: CancelHandle);

    /// Called for each decoded item. Returning an error fails the session.
    fn on_next(&mut self, item: T) -> Result<(), CallbackError>;

    /// Called once if the session fails.
    ///
    /// Return `Ok(())` if the error was handled. Returning it (or another
    /// error) propagates it out of the operation that started the session.
    fn on_failed(&mut self, error: StreamError) -> Result<(), StreamError>;

    /// Called once when the stream ends cleanly.
    fn on_finished(&mut self);
}

impl<T, C: StreamCallback<T> + ?Sized> StreamCallback<T> for Box<C> {
    fn on_starting(&mut self, cancel: CancelHandle) {
        (**self).on_starting(cancel)
    }

    fn on_next(&mut self, item: T) -> Result<(), CallbackError> {
        (**self).on_next(item)
    }

    fn on_failed(&mut self, error: StreamError) -> Result<(), StreamError> {
        (**self).on_failed(error)
    }

    fn on_finished(&mut self) {
        (**self).on_finished()
    }
}

type StartingFn = Box<dyn FnMut(CancelHandle) + Send>;
type NextFn<T> = Box<dyn FnMut(T) -> Result<(), CallbackError> + Send>;
type FailedFn = Box<dyn FnMut(StreamError) -> Result<(), StreamError> + Send>;
type FinishedFn = Box<dyn FnMut() + Send>;

/// Closure-based callback.
///
/// Handlers that are not set behave as follows:
/// - `on_starting`: ignored, the consumer gives up the ability to cancel.
/// - `on_failed`: the error is propagated to the caller of the operation.
/// - `on_finished`: ignored.
pub struct Handlers<T> {
    on_starting: Option<StartingFn>,
    on_next: NextFn<T>,
    on_failed: Option<FailedFn>,
    on_finished: Option<FinishedFn>,
}

impl<T> Handlers<T> {
    pub fn new<F>(on_next: F) -> Self
    where
        F: FnMut(T) -> Result<(), CallbackError> + Send + 'static,
    {
        Self {
            on_starting: None,
            on_next: Box::new(on_next),
            on_failed: None,
            on_finished: None,
        }
    }

    pub fn with_on_starting<F>(mut self, f: F) -> Self
    where
        F: FnMut(CancelHandle) + Send + 'static,
    {
        self.on_starting = Some(Box::new(f));
        self
    }

    pub fn with_on_failed<F>(mut self, f: F) -> Self
    where
        F: FnMut(StreamError) -> Result<(), StreamError> + Send + 'static,
    {
        self.on_failed = Some(Box::new(f));
        self
    }

    pub fn with_on_finished<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_finished = Some(Box::new(f));
        self
    }
}

impl<T> StreamCallback<T> for Handlers<T> {
    fn on_starting(&mut self, cancel: CancelHandle) {
        if let Some(f) = self.on_starting.as_mut() {
            f(cancel);
        }
    }

    fn on_next(&mut self, item: T) -> Result<(), CallbackError> {
        (self.on_next)(item)
    }

    fn on_failed(&mut self, error: StreamError) -> Result<(), StreamError> {
        match self.on_failed.as_mut() {
            Some(f) => f(error),
            None => Err(error),
        }
    }

    fn on_finished(&mut self) {
        if let Some(f) = self.on_finished.as_mut() {
            f();
        }
    }
}
