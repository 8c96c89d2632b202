// ABOUTME: Entry point for the dockstream CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, StreamArgs};
use commands::LogTarget;
use dockstream::config::{self, Config};
use dockstream::error::{Error, Result};
use dockstream::output::{Output, OutputMode};
use dockstream::runtime::{EngineClient, EventsOptions, ExecConfig, LogOptions, RuntimeErrorKind};
use dockstream::types::ContainerId;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        if let Error::Runtime(runtime) = &e
            && runtime.kind() == RuntimeErrorKind::NoRuntimeFound
        {
            output.progress("hint: set DOCKER_HOST, pass --socket, or add engine.socket to dockstream.yml");
        }
        let code = match e {
            Error::ExitStatus(code) => code.clamp(1, 255) as i32,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let socket = cli.socket.as_deref();

    match cli.command {
        Commands::Init { runtime, force } => {
            let path = config::init_config(&cwd, runtime.map(Into::into), force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Logs {
            target,
            service,
            task,
            follow,
            tail,
            timestamps,
            since,
            until,
            stream,
        } => {
            let (config, client) = setup(&cwd, socket)?;
            let defaults = config.log_options();
            let opts = LogOptions {
                follow,
                tail: tail.or(defaults.tail),
                timestamps: timestamps || defaults.timestamps,
                since,
                until,
                ..defaults
            };
            let target = if service {
                LogTarget::Service(target.into())
            } else if task {
                LogTarget::Task(target.into())
            } else {
                LogTarget::Container(target.into())
            };
            commands::logs(&client, target, &opts, timeout(&stream, &config), output).await
        }
        Commands::Attach {
            container,
            logs,
            stream,
        } => {
            let (config, client) = setup(&cwd, socket)?;
            let container: ContainerId = container.into();
            commands::attach(&client, &container, logs, timeout(&stream, &config), output).await
        }
        Commands::Exec {
            container,
            tty,
            workdir,
            user,
            env,
            stream,
            command,
        } => {
            let (config, client) = setup(&cwd, socket)?;
            let exec_config = ExecConfig {
                env,
                working_dir: workdir,
                user,
                tty,
                ..ExecConfig::command(command)
            };
            let container: ContainerId = container.into();
            commands::exec_command(
                &client,
                &container,
                &exec_config,
                timeout(&stream, &config),
                output,
            )
            .await
        }
        Commands::Stats {
            container,
            no_stream,
            stream,
        } => {
            let (config, client) = setup(&cwd, socket)?;
            let container: ContainerId = container.into();
            commands::stats(&client, &container, !no_stream, timeout(&stream, &config), output)
                .await
        }
        Commands::Events {
            since,
            until,
            filters,
            stream,
        } => {
            let (config, client) = setup(&cwd, socket)?;
            let opts = filters.into_iter().fold(
                EventsOptions {
                    since,
                    until,
                    ..EventsOptions::default()
                },
                |opts, (key, value)| opts.filter(key, value),
            );
            commands::events(&client, &opts, timeout(&stream, &config), output).await
        }
    }
}

/// Load the config (defaults when absent) and connect to the engine.
fn setup(cwd: &Path, socket: Option<&Path>) -> Result<(Config, EngineClient)> {
    let config = Config::discover_or_default(cwd)?;
    let client = commands::connect(&config, socket)?;
    Ok((config, client))
}

fn timeout(args: &StreamArgs, config: &Config) -> Duration {
    args.timeout.unwrap_or(config.stream_timeout)
}
