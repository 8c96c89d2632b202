// ABOUTME: Streaming operations trait: attach, logs, exec start, stats and events.
// ABOUTME: Every entry point delivers its output through a StreamCallback.

use super::options::{AttachOptions, EventsOptions, ExecStartOptions, LogOptions, StatsOptions};
use super::sealed::Sealed;
use crate::runtime::error::EngineError;
use crate::stream::{Frame, Outcome, StreamCallback};
use crate::types::{ContainerId, ExecId, ServiceId, TaskId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Long-lived output streams.
///
/// Each call opens one connection, runs a streaming session on its own task
/// and resolves when the session reaches a terminal state. The session is
/// cancelled once `timeout` has elapsed since it started.
///
/// `Err` is returned only when the request could not be opened (no callback
/// has run) or when the callback's `on_failed` propagated an error.
#[async_trait]
pub trait StreamOps: Sealed + Send + Sync {
    /// Output of a running container.
    async fn attach<C>(
        &self,
        container: &ContainerId,
        opts: &AttachOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static;

    /// Logs of a container.
    async fn logs<C>(
        &self,
        container: &ContainerId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static;

    /// Logs of all tasks of a swarm service.
    async fn service_logs<C>(
        &self,
        service: &ServiceId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static;

    /// Logs of one swarm task.
    async fn task_logs<C>(
        &self,
        task: &TaskId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static;

    /// Start a created exec instance and stream its output.
    async fn exec_start<C>(
        &self,
        exec: &ExecId,
        opts: &ExecStartOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static;

    /// Resource usage samples of a container, decoded as `T`.
    async fn stats<T, C>(
        &self,
        container: &ContainerId,
        opts: &StatsOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        C: StreamCallback<T> + 'static;

    /// Engine events, decoded as `T`. Stays open until `opts.until` (if set)
    /// or until cancelled.
    async fn events<T, C>(
        &self,
        opts: &EventsOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        C: StreamCallback<T> + 'static;
}
