// ABOUTME: Shared helpers for commands that run a streaming session.
// ABOUTME: Engine connection, Ctrl-C cancellation, frame printing and outcome reporting.

use dockstream::config::Config;
use dockstream::error::{Error, Result};
use dockstream::output::Output;
use dockstream::runtime::{EngineClient, connect_local};
use dockstream::stream::{CancelHandle, CancelReason, Frame, Handlers, Outcome};
use std::path::Path;
use std::time::Duration;

/// Connect to the engine named by `--socket`, the config, or detection.
pub fn connect(config: &Config, socket: Option<&Path>) -> Result<EngineClient> {
    let mut engine = config.engine.clone();
    if let Some(socket) = socket {
        engine.socket = Some(socket.display().to_string());
    }
    let runtime_config = (!engine.is_empty()).then_some(&engine);
    let client = connect_local(runtime_config, config.client_settings())?;
    Ok(client)
}

/// Cancel the session when the user presses Ctrl-C. The listener exits with the session.
pub fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    tracing::debug!("interrupted, cancelling stream");
                    handle.cancel();
                }
            }
            _ = handle.terminated() => {}
        }
    });
}

/// Callback writing every frame to the terminal.
pub fn frame_printer(output: Output) -> Handlers<Frame> {
    Handlers::new(move |frame: Frame| output.frame(&frame).map_err(Into::into))
        .with_on_starting(cancel_on_ctrl_c)
}

/// Report how a session ended. A deadline expiry is an error, an interrupt is not.
pub fn report(outcome: Outcome, timeout: Duration, output: &Output, what: &str) -> Result<()> {
    match outcome {
        Outcome::Finished => {
            output.success(&format!("{what} finished"));
            Ok(())
        }
        Outcome::Failed => Ok(()),
        Outcome::Cancelled(CancelReason::Requested) => {
            output.progress(&format!("{what} cancelled"));
            Ok(())
        }
        Outcome::Cancelled(CancelReason::DeadlineElapsed) => Err(Error::TimedOut(
            humantime::format_duration(timeout).to_string(),
        )),
    }
}
