// ABOUTME: Events command implementation.
// ABOUTME: Prints one line (or JSON object) per engine event until cancelled or `--until`.

use super::session::{cancel_on_ctrl_c, report};
use dockstream::error::Result;
use dockstream::output::Output;
use dockstream::runtime::{EngineClient, EventMessage, EventsOptions, StreamOps};
use dockstream::stream::Handlers;
use std::time::Duration;

pub async fn events(
    client: &EngineClient,
    opts: &EventsOptions,
    timeout: Duration,
    output: &Output,
) -> Result<()> {
    let printer = output.clone();
    let callback = Handlers::new(move |event: EventMessage| {
        printer.event(&event).map_err(Into::into)
    })
    .with_on_starting(cancel_on_ctrl_c);

    let outcome = client.events(opts, callback, timeout).await?;
    report(outcome, timeout, output, "events")
}
