// ABOUTME: Stats command implementation.
// ABOUTME: Prints one line (or JSON object) per resource usage sample.

use super::session::{cancel_on_ctrl_c, report};
use dockstream::error::Result;
use dockstream::output::Output;
use dockstream::runtime::{ContainerStats, EngineClient, StatsOptions, StreamOps};
use dockstream::stream::Handlers;
use dockstream::types::ContainerId;
use std::time::Duration;

pub async fn stats(
    client: &EngineClient,
    container: &ContainerId,
    follow: bool,
    timeout: Duration,
    output: &Output,
) -> Result<()> {
    let opts = StatsOptions {
        stream: follow,
        ..StatsOptions::default()
    };
    let printer = output.clone();
    let callback = Handlers::new(move |sample: ContainerStats| {
        printer.stats(&sample).map_err(Into::into)
    })
    .with_on_starting(cancel_on_ctrl_c);

    let outcome = client
        .stats(container, &opts, callback, timeout)
        .await?;
    report(outcome, timeout, output, "stats")
}
