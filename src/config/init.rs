// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented dockstream.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::RuntimeType;

use super::{CONFIG_FILENAME, Config};

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, runtime: Option<RuntimeType>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::default();
    config.engine.runtime = runtime;

    std::fs::write(&config_path, generate_template_yaml(&config))?;
    tracing::debug!(path = %config_path.display(), "config written");
    Ok(config_path)
}

pub fn generate_template_yaml(config: &Config) -> String {
    let engine = match config.engine.runtime {
        Some(runtime) => format!("engine:\n  runtime: {runtime}\n  # socket: /var/run/docker.sock\n"),
        // Detected from DOCKER_HOST and the well-known sockets when unset.
        None => "# engine:\n#   runtime: docker\n#   socket: /var/run/docker.sock\n".to_string(),
    };
    format!(
        r#"{engine}

api_version: {api_version}

# Streams are cancelled once they have run this long.
stream_timeout: {stream_timeout}
connect_timeout: {connect_timeout}

# Largest multiplexed frame payload accepted, in bytes.
max_payload: {max_payload}

logs:
  # tail: 100
  timestamps: {timestamps}
"#,
        api_version = config.api_version,
        stream_timeout = humantime::format_duration(config.stream_timeout),
        connect_timeout = humantime::format_duration(config.connect_timeout),
        max_payload = config.max_payload,
        timestamps = config.logs.timestamps,
    )
}
