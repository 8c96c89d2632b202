// ABOUTME: Option types for streaming operations and exec creation.
// ABOUTME: Each option set knows how to render itself as request query parameters.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::runtime::request::StreamRequest;

/// Options for container, service and task logs.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Include stdout.
    pub stdout: bool,
    /// Include stderr.
    pub stderr: bool,
    /// Keep the stream open for new output (like `tail -f`).
    pub follow: bool,
    /// Prefix each line with an RFC 3339 timestamp.
    pub timestamps: bool,
    /// Include extra attributes (labels, env) given to the log driver.
    pub details: bool,
    /// Number of lines to show from the end (`None` = all).
    pub tail: Option<u64>,
    /// Only logs after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only logs before this time.
    pub until: Option<DateTime<Utc>>,
    /// Whether the container has a TTY. Inspected when not given.
    pub tty: Option<bool>,
}

impl LogOptions {
    /// Follow stdout and stderr from the beginning.
    pub fn follow_all() -> Self {
        Self {
            stdout: true,
            stderr: true,
            follow: true,
            ..Self::default()
        }
    }

    /// The last `n` lines of stdout and stderr, then stop.
    pub fn tail(n: u64) -> Self {
        Self {
            stdout: true,
            stderr: true,
            tail: Some(n),
            ..Self::default()
        }
    }

    pub(crate) fn apply(&self, request: StreamRequest) -> StreamRequest {
        request
            .query_flag("stdout", self.stdout)
            .query_flag("stderr", self.stderr)
            .query_flag("follow", self.follow)
            .query_flag("timestamps", self.timestamps)
            .query_flag("details", self.details)
            .query(
                "tail",
                self.tail
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "all".to_string()),
            )
            .query_opt("since", self.since.map(|t| t.timestamp()))
            .query_opt("until", self.until.map(|t| t.timestamp()))
    }
}

/// Options for attaching to a running container.
#[derive(Debug, Clone)]
pub struct AttachOptions {
    pub stdout: bool,
    pub stderr: bool,
    /// Replay output produced before the attach.
    pub logs: bool,
    /// Stream output produced after the attach.
    pub stream: bool,
    /// Whether the container has a TTY. Inspected when not given.
    pub tty: Option<bool>,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            logs: false,
            stream: true,
            tty: None,
        }
    }
}

impl AttachOptions {
    pub(crate) fn apply(&self, request: StreamRequest) -> StreamRequest {
        request
            .query("stdout", self.stdout)
            .query("stderr", self.stderr)
            .query("logs", self.logs)
            .query("stream", self.stream)
    }
}

/// Options for starting an exec instance.
#[derive(Debug, Clone, Default)]
pub struct ExecStartOptions {
    /// Whether the exec instance has a TTY. Inspected when not given.
    pub tty: Option<bool>,
}

/// Options for container stats.
#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Keep sampling (about once per second) instead of returning one sample.
    pub stream: bool,
    /// With `stream: false`, return the first sample without waiting for a CPU delta.
    pub one_shot: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            stream: true,
            one_shot: false,
        }
    }
}

impl StatsOptions {
    pub(crate) fn apply(&self, request: StreamRequest) -> StreamRequest {
        request
            .query("stream", self.stream)
            .query("one-shot", self.one_shot && !self.stream)
    }
}

/// Options for the system events stream.
#[derive(Debug, Clone, Default)]
pub struct EventsOptions {
    /// Replay events since this time.
    pub since: Option<DateTime<Utc>>,
    /// Stop once events reach this time. Without it the stream stays open.
    pub until: Option<DateTime<Utc>>,
    /// Engine filters, e.g. `type=container`, `event=start`.
    pub filters: BTreeMap<String, Vec<String>>,
}

impl EventsOptions {
    /// Add a filter value under `key`.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.entry(key.into()).or_default().push(value.into());
        self
    }

    pub(crate) fn apply(&self, request: StreamRequest) -> StreamRequest {
        let filters = (!self.filters.is_empty()).then(|| serde_json::json!(self.filters));
        request
            .query_opt("since", self.since.map(|t| t.timestamp()))
            .query_opt("until", self.until.map(|t| t.timestamp()))
            .query_opt("filters", filters)
    }
}

/// Configuration for a new exec instance.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Command and arguments to run.
    pub cmd: Vec<String>,
    /// Environment variables (`KEY=value`).
    pub env: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    /// Allocate a TTY. Output of a TTY exec is raw, not multiplexed.
    pub tty: bool,
    pub privileged: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            cmd: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            user: None,
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
            privileged: false,
        }
    }
}

impl ExecConfig {
    pub fn command<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// State of an exec instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecInfo {
    pub running: bool,
    pub exit_code: Option<i64>,
    pub tty: bool,
}
