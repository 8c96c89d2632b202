// ABOUTME: Attach command implementation.
// ABOUTME: Streams the output of a running container until it exits or is interrupted.

use super::session::{frame_printer, report};
use dockstream::error::Result;
use dockstream::output::Output;
use dockstream::runtime::{AttachOptions, EngineClient, StreamOps};
use dockstream::types::ContainerId;
use std::time::Duration;

pub async fn attach(
    client: &EngineClient,
    container: &ContainerId,
    replay_logs: bool,
    timeout: Duration,
    output: &Output,
) -> Result<()> {
    let opts = AttachOptions {
        logs: replay_logs,
        ..AttachOptions::default()
    };
    output.progress(&format!("→ Attached to {}", container.short()));
    let outcome = client
        .attach(container, &opts, frame_printer(output.clone()), timeout)
        .await?;
    report(outcome, timeout, output, "attach")
}
