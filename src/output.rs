// ABOUTME: Output formatting for CLI feedback and streamed data.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::io::{self, Write};
use std::time::Instant;

use crate::runtime::{ContainerStats, EventMessage};
use crate::stream::{Frame, StreamKind};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Only streamed data, no progress messages
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Instant,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: Instant::now(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Write one frame: stdout and raw frames to stdout, everything else to stderr.
    pub fn frame(&self, frame: &Frame) -> io::Result<()> {
        if self.mode == OutputMode::Json {
            let event = FrameEvent {
                event: "frame",
                stream: frame.kind().to_string(),
                payload: &frame.payload_as_str(),
            };
            return print_json(&event);
        }

        match frame.kind() {
            StreamKind::Output | StreamKind::Raw => {
                let mut out = io::stdout().lock();
                out.write_all(frame.payload())?;
                out.flush()
            }
            _ => {
                let mut err = io::stderr().lock();
                err.write_all(frame.payload())?;
                err.flush()
            }
        }
    }

    /// Write one stats sample as a summary line or a JSON object.
    pub fn stats(&self, stats: &ContainerStats) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => print_json(stats),
            OutputMode::Normal | OutputMode::Quiet => {
                println!("{}", stats_line(stats));
                Ok(())
            }
        }
    }

    /// Write one engine event as a line or a JSON object.
    pub fn event(&self, event: &EventMessage) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => print_json(event),
            OutputMode::Normal | OutputMode::Quiet => {
                println!("{}", event_line(event));
                Ok(())
            }
        }
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("{message}");
        }
    }

    /// Print the final result of a stream with its duration.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("{message} ({:.1}s)", self.elapsed_secs()),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.elapsed_secs(),
                };
                print_json(&event).ok();
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.elapsed_secs(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{json}")?;
    out.flush()
}

/// `TIME TYPE ACTION NAME` for one event, time in RFC 3339.
pub fn event_line(event: &EventMessage) -> String {
    let time = chrono::DateTime::from_timestamp(event.time, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| event.time.to_string());
    format!(
        "{} {} {} {}",
        time,
        event.kind,
        event.action,
        event.actor_name()
    )
}

/// `NAME  CPU %  MEM USAGE / LIMIT  MEM %  PIDS` for one sample.
pub fn stats_line(stats: &ContainerStats) -> String {
    let limit = stats.memory_stats.limit.unwrap_or(0);
    format!(
        "{:<20} {:>7.2}% {:>10} / {:<10} {:>6.2}% {:>5}",
        stats.display_name(),
        stats.cpu_percent(),
        human_bytes(stats.memory_usage()),
        human_bytes(limit),
        stats.memory_percent(),
        stats.pids_stats.current.unwrap_or(0),
    )
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    duration_secs: f64,
}

#[derive(Serialize)]
struct FrameEvent<'a> {
    event: &'a str,
    stream: String,
    payload: &'a str,
}
