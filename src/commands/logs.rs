// ABOUTME: Logs command implementation.
// ABOUTME: Streams container, service or task logs to the terminal.

use super::session::{frame_printer, report};
use dockstream::error::Result;
use dockstream::output::Output;
use dockstream::runtime::{EngineClient, LogOptions, StreamOps};
use dockstream::types::{ContainerId, ServiceId, TaskId};
use std::time::Duration;

/// Whose logs to show.
pub enum LogTarget {
    Container(ContainerId),
    Service(ServiceId),
    Task(TaskId),
}

pub async fn logs(
    client: &EngineClient,
    target: LogTarget,
    opts: &LogOptions,
    timeout: Duration,
    output: &Output,
) -> Result<()> {
    let callback = frame_printer(output.clone());
    let outcome = match &target {
        LogTarget::Container(id) => client.logs(id, opts, callback, timeout).await?,
        LogTarget::Service(id) => client.service_logs(id, opts, callback, timeout).await?,
        LogTarget::Task(id) => client.task_logs(id, opts, callback, timeout).await?,
    };
    report(outcome, timeout, output, "logs")
}
