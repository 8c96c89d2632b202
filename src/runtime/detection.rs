// ABOUTME: Engine socket detection on the local system.
// ABOUTME: Honours explicit config and DOCKER_HOST, then probes Podman and Docker sockets.

use super::types::{RuntimeConfig, RuntimeInfo, RuntimeType};
use std::path::Path;

/// Error during engine detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("unsupported DOCKER_HOST {0:?}: only unix:// sockets are supported")]
    UnsupportedHost(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the engine to talk to.
///
/// Detection order:
/// 1. Explicit `config` (runtime and/or socket)
/// 2. `DOCKER_HOST` with a `unix://` scheme
/// 3. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 4. Rootful Podman socket (`/run/podman/podman.sock`)
/// 5. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: Option<&RuntimeConfig>) -> Result<RuntimeInfo, DetectionError> {
    let docker_host = std::env::var("DOCKER_HOST").ok();
    detect_with(
        config,
        docker_host.as_deref(),
        get_uid().as_deref(),
        |path| Path::new(path).exists(),
    )
}

fn detect_with(
    config: Option<&RuntimeConfig>,
    docker_host: Option<&str>,
    uid: Option<&str>,
    exists: impl Fn(&str) -> bool,
) -> Result<RuntimeInfo, DetectionError> {
    // 1. Explicit override
    if let Some(cfg) = config {
        match (cfg.runtime, cfg.socket.as_ref()) {
            (Some(runtime_type), socket) => {
                return Ok(RuntimeInfo {
                    runtime_type,
                    socket_path: socket
                        .cloned()
                        .unwrap_or_else(|| default_socket_path(runtime_type, uid)),
                });
            }
            (None, Some(socket)) => {
                return Ok(RuntimeInfo {
                    runtime_type: RuntimeType::from_socket_path(socket),
                    socket_path: socket.clone(),
                });
            }
            (None, None) => {}
        }
    }

    // 2. DOCKER_HOST
    if let Some(host) = docker_host.filter(|h| !h.is_empty()) {
        let socket = host
            .strip_prefix("unix://")
            .ok_or_else(|| DetectionError::UnsupportedHost(host.to_string()))?;
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::from_socket_path(socket),
            socket_path: socket.to_string(),
        });
    }

    // 3. Rootless Podman
    if let Some(uid) = uid {
        let rootless_socket = rootless_podman(uid);
        if exists(&rootless_socket) {
            return Ok(RuntimeInfo {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    // 4. Rootful Podman
    if exists(ROOTFUL_PODMAN) {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    // 5. Docker
    if exists(DOCKER_SOCKET) {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn rootless_podman(uid: &str) -> String {
    format!("/run/user/{}/podman/podman.sock", uid)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

/// Socket an engine listens on when none is configured.
///
/// For Podman the rootless socket is preferred when it exists.
pub fn default_socket_path(runtime: RuntimeType, uid: Option<&str>) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => uid
            .map(rootless_podman)
            .filter(|path| Path::new(path).exists())
            .unwrap_or_else(|| ROOTFUL_PODMAN.to_string()),
    }
}
