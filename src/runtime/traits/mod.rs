// ABOUTME: Capability traits for engine clients.
// ABOUTME: StreamOps for long-lived output and event streams, ExecOps for exec instances.

mod exec;
mod options;
pub(crate) mod sealed;
mod streams;

pub use exec::ExecOps;
pub use options::{
    AttachOptions, EventsOptions, ExecConfig, ExecInfo, ExecStartOptions, LogOptions,
    StatsOptions,
};
pub use streams::StreamOps;
