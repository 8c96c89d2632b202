// ABOUTME: Session state machine shared between a session and its cancel handles.
// ABOUTME: Consumer cancellation and deadline expiry drive the same transition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Notify;

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Active,
    Finished,
    Failed,
    Cancelled(CancelReason),
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Starting | SessionState::Active)
    }

    fn to_u8(self) -> u8 {
        match self {
            SessionState::Starting => 0,
            SessionState::Active => 1,
            SessionState::Finished => 2,
            SessionState::Failed => 3,
            SessionState::Cancelled(CancelReason::Requested) => 4,
            SessionState::Cancelled(CancelReason::DeadlineElapsed) => 5,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Starting,
            1 => SessionState::Active,
            2 => SessionState::Finished,
            3 => SessionState::Failed,
            4 => SessionState::Cancelled(CancelReason::Requested),
            _ => SessionState::Cancelled(CancelReason::DeadlineElapsed),
        }
    }
}

/// What stopped a cancelled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The consumer invoked its cancel handle.
    Requested,
    /// The session deadline passed.
    DeadlineElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancelled by consumer"),
            CancelReason::DeadlineElapsed => write!(f, "deadline elapsed"),
        }
    }
}

struct Inner {
    state: AtomicU8,
    notify: Notify,
}

/// Capability to stop a streaming session.
///
/// Cheap to clone and safe to use from any task or thread. Cancelling is
/// idempotent: once the session has reached any terminal state, further calls
/// do nothing.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(SessionState::Starting.to_u8()),
                notify: Notify::new(),
            }),
        }
    }

    /// Request termination of the session.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Requested);
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state(), SessionState::Cancelled(_))
    }

    /// Resolves once the session has been cancelled. Never resolves for a
    /// session that ends any other way.
    pub async fn cancelled(&self) {
        self.wait_for(|state| matches!(state, SessionState::Cancelled(_)))
            .await;
    }

    /// Resolves with the terminal state once the session has ended in any way.
    pub async fn terminated(&self) -> SessionState {
        self.wait_for(SessionState::is_terminal).await
    }

    async fn wait_for(&self, done: impl Fn(SessionState) -> bool) -> SessionState {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let state = self.state();
            if done(state) {
                return state;
            }
            notified.await;
        }
    }

    /// Move a live session to `Cancelled`. Returns `false` if it was already terminal.
    pub(crate) fn cancel_with(&self, reason: CancelReason) -> bool {
        let target = SessionState::Cancelled(reason).to_u8();
        let mut current = self.inner.state.load(Ordering::SeqCst);
        loop {
            if SessionState::from_u8(current).is_terminal() {
                return false;
            }
            match self.inner.state.compare_exchange(
                current,
                target,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    tracing::debug!(%reason, "stream session cancelled");
                    self.inner.notify.notify_waiters();
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// `Starting -> Active`. Fails if the consumer cancelled during start.
    pub(crate) fn activate(&self) -> bool {
        self.transition(SessionState::Starting, SessionState::Active)
    }

    /// `Active -> Finished` or `Active -> Failed`. Fails if cancellation won the race.
    pub(crate) fn complete(&self, terminal: SessionState) -> bool {
        debug_assert!(matches!(
            terminal,
            SessionState::Finished | SessionState::Failed
        ));
        self.transition(SessionState::Active, terminal)
    }

    /// Any live state to `Failed`, for a session task that unwound.
    pub(crate) fn abandon(&self) {
        if !self.transition(SessionState::Active, SessionState::Failed) {
            self.transition(SessionState::Starting, SessionState::Failed);
        }
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let moved = self
            .inner
            .state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if moved && to.is_terminal() {
            self.inner.notify.notify_waiters();
        }
        moved
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("state", &self.state())
            .finish()
    }
}
