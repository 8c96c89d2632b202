// ABOUTME: Engine type definitions for Docker and Podman.
// ABOUTME: RuntimeType, the detected RuntimeInfo and the explicit RuntimeConfig.

use serde::{Deserialize, Serialize};

/// The container engine behind a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Guess the engine from a socket path. Anything not mentioning podman is Docker.
    pub fn from_socket_path(path: &str) -> Self {
        if path.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Podman => write!(f, "podman"),
        }
    }
}

/// Engine selected for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub runtime_type: RuntimeType,
    /// Path to the engine's unix socket.
    pub socket_path: String,
}

/// `engine` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Explicit engine type (overrides auto-detection).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeType>,
    /// Explicit socket path (overrides the engine's default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
}

impl RuntimeConfig {
    pub fn is_empty(&self) -> bool {
        self.runtime.is_none() && self.socket.is_none()
    }
}
