// ABOUTME: Command module aggregator for the dockstream CLI.
// ABOUTME: Re-exports logs, attach, exec, stats and events command handlers.

mod attach;
mod events;
mod exec;
mod logs;
mod session;
mod stats;

pub use attach::attach;
pub use events::events;
pub use exec::exec_command;
pub use logs::{LogTarget, logs};
pub use session::connect;
pub use stats::stats;
