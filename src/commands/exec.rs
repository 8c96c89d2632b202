// ABOUTME: Exec command implementation.
// ABOUTME: Creates an exec instance, streams its output and reports its exit code.

use super::session::{frame_printer, report};
use dockstream::error::{Error, Result};
use dockstream::output::Output;
use dockstream::runtime::{EngineClient, ExecConfig, ExecOps, ExecStartOptions, StreamOps};
use dockstream::stream::Outcome;
use dockstream::types::ContainerId;
use std::time::Duration;

/// Execute a command in a container and stream its output.
pub async fn exec_command(
    client: &EngineClient,
    container: &ContainerId,
    config: &ExecConfig,
    timeout: Duration,
    output: &Output,
) -> Result<()> {
    let exec_id = client.exec_create(container, config).await?;
    output.progress(&format!(
        "→ Executing `{}` in {}",
        config.cmd.join(" "),
        container.short()
    ));

    let opts = ExecStartOptions {
        tty: Some(config.tty),
    };
    let outcome = client
        .exec_start(&exec_id, &opts, frame_printer(output.clone()), timeout)
        .await?;
    if outcome != Outcome::Finished {
        return report(outcome, timeout, output, "exec");
    }

    // Check exit code
    let info = client.exec_inspect(&exec_id).await?;
    match info.exit_code {
        Some(code) if code != 0 => Err(Error::ExitStatus(code)),
        _ => report(outcome, timeout, output, "exec"),
    }
}
