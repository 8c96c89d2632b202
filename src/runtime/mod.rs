// ABOUTME: Engine access for Docker and Podman: detection, client and streaming operations.
// ABOUTME: Auto-detects the local engine socket or uses explicit config.

mod client;
mod detection;
mod error;
mod events;
mod request;
mod stats;
mod traits;
mod types;

pub use client::{ClientSettings, DEFAULT_API_VERSION, EngineClient, OpenedStream};
pub use detection::{DetectionError, default_socket_path, detect_local};
pub use error::{EngineError, RuntimeError, RuntimeErrorKind};
pub use events::{EventActor, EventMessage};
pub use request::StreamRequest;
pub use stats::{ContainerStats, CpuStats, CpuUsage, MemoryStats, NetworkStats, PidsStats};
pub use traits::{
    AttachOptions, EventsOptions, ExecConfig, ExecInfo, ExecOps, ExecStartOptions, LogOptions,
    StatsOptions, StreamOps,
};
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};

/// Detect the local engine and create a client for it.
pub fn connect_local(
    config: Option<&RuntimeConfig>,
    settings: ClientSettings,
) -> Result<EngineClient, RuntimeError> {
    let info = detect_local(config)?;
    tracing::debug!(runtime = %info.runtime_type, socket = %info.socket_path, "engine selected");
    Ok(EngineClient::connect(&info, settings)?)
}
