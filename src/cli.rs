// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dockstream::runtime::RuntimeType;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dockstream")]
#[command(about = "Stream logs, attach, exec and stats from Docker and Podman engines")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine socket (overrides config and detection)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Print JSON lines instead of text
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,

    /// Print only streamed data
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new dockstream.yml configuration file
    Init {
        /// Engine to pin in the config (detected when omitted)
        #[arg(long, value_enum)]
        runtime: Option<RuntimeArg>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show logs of a container, service or task
    Logs {
        /// Container (or service/task) id or name
        target: String,

        /// Treat the target as a swarm service
        #[arg(long, conflicts_with = "task")]
        service: bool,

        /// Treat the target as a swarm task
        #[arg(long)]
        task: bool,

        /// Keep streaming new output
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show from the end
        #[arg(short = 'n', long)]
        tail: Option<u64>,

        /// Show timestamps
        #[arg(short, long)]
        timestamps: bool,

        /// Only logs since this time (RFC 3339 or a duration like 10m)
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,

        /// Only logs until this time (RFC 3339 or a duration like 10m)
        #[arg(long, value_parser = parse_time)]
        until: Option<DateTime<Utc>>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Attach to the output of a running container
    Attach {
        container: String,

        /// Replay output produced before attaching
        #[arg(long)]
        logs: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Run a command in a running container
    Exec {
        container: String,

        /// Allocate a TTY (output is not split into stdout and stderr)
        #[arg(short, long)]
        tty: bool,

        /// Working directory inside the container
        #[arg(short, long)]
        workdir: Option<String>,

        /// User to run as
        #[arg(short, long)]
        user: Option<String>,

        /// Environment variables (KEY=value)
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        #[command(flatten)]
        stream: StreamArgs,

        /// Command and arguments
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },

    /// Show resource usage of a container
    Stats {
        container: String,

        /// Print one sample and exit
        #[arg(long)]
        no_stream: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Stream engine events
    Events {
        /// Replay events since this time (RFC 3339 or a duration like 10m)
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,

        /// Stop at this time (RFC 3339 or a duration like 10m)
        #[arg(long, value_parser = parse_time)]
        until: Option<DateTime<Utc>>,

        /// Engine filter, e.g. type=container or event=die
        #[arg(short, long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        #[command(flatten)]
        stream: StreamArgs,
    },
}

#[derive(Args, Clone, Debug)]
pub struct StreamArgs {
    /// Stop the stream after this long (e.g. 30s, 5m; defaults to config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RuntimeArg {
    Docker,
    Podman,
}

impl From<RuntimeArg> for RuntimeType {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Docker => RuntimeType::Docker,
            RuntimeArg::Podman => RuntimeType::Podman,
        }
    }
}

/// Absolute RFC 3339 time, or a duration meaning that long ago.
fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    let ago = humantime::parse_duration(s)
        .map_err(|_| format!("expected RFC 3339 time or duration, got {s:?}"))?;
    let ago = chrono::Duration::from_std(ago).map_err(|e| e.to_string())?;
    Ok(Utc::now() - ago)
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}
