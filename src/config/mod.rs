// ABOUTME: Configuration types and parsing for dockstream.yml.
// ABOUTME: Engine selection, stream timeouts, payload limit and log defaults.

mod deserialize;
mod init;

pub use init::{generate_template_yaml, init_config};

use crate::error::{Error, Result};
use crate::runtime::{ClientSettings, DEFAULT_API_VERSION, LogOptions, RuntimeConfig};
use crate::stream::DEFAULT_MAX_PAYLOAD;
use deserialize::{deserialize_api_version, deserialize_max_payload};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "dockstream.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockstream.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockstream/config.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: RuntimeConfig,

    #[serde(
        default = "default_api_version",
        deserialize_with = "deserialize_api_version"
    )]
    pub api_version: String,

    /// Session deadline for streaming operations.
    #[serde(default = "default_stream_timeout", with = "humantime_serde")]
    pub stream_timeout: Duration,

    /// Bound on connecting and receiving response headers.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(
        default = "default_max_payload",
        deserialize_with = "deserialize_max_payload"
    )]
    pub max_payload: u32,

    #[serde(default)]
    pub logs: LogDefaults,
}

/// Defaults for `dockstream logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogDefaults {
    /// Lines to show from the end of the log (all when unset).
    #[serde(default)]
    pub tail: Option<u64>,
    #[serde(default)]
    pub timestamps: bool,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_stream_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_payload() -> u32 {
    DEFAULT_MAX_PAYLOAD
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: RuntimeConfig::default(),
            api_version: default_api_version(),
            stream_timeout: default_stream_timeout(),
            connect_timeout: default_connect_timeout(),
            max_payload: default_max_payload(),
            logs: LogDefaults::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// First config file present in `dir`, if any.
    pub fn locate(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::locate(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    /// Like `discover`, but a missing file yields the defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.stream_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "stream_timeout must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.engine.socket.as_deref().is_some_and(str::is_empty) {
            return Err(Error::InvalidConfig("engine.socket is empty".to_string()));
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_version: self.api_version.clone(),
            connect_timeout: self.connect_timeout,
            max_payload: self.max_payload,
        }
    }

    /// Engine override, if the config names one.
    pub fn runtime_config(&self) -> Option<&RuntimeConfig> {
        (!self.engine.is_empty()).then_some(&self.engine)
    }

    /// Log options seeded from the configured defaults.
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            stdout: true,
            stderr: true,
            tail: self.logs.tail,
            timestamps: self.logs.timestamps,
            ..LogOptions::default()
        }
    }
}
