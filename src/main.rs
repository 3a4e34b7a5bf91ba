#![forbid(unsafe_code)]

mod cli;
mod client;
mod constants;
mod controller;
mod daemon;
mod display;
mod error;
mod ipc;
mod overlay;
mod reconcile;
mod scheduler;
mod screen;
mod settings;
mod types;
mod x11_utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command, RunArgs};
use constants::paths;
use daemon::{run_daemon, DaemonPaths};

fn parse_log_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&cli.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let socket = match cli.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };
    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match client::request_for(&command) {
        Some(request) => client::run_client(&socket, request),
        None => {
            let settings = match command {
                Command::Run(RunArgs {
                    settings: Some(path),
                }) => path,
                _ => PathBuf::from(paths::SETTINGS_FILE),
            };
            run_daemon(DaemonPaths { settings, socket })
                .inspect_err(|e| error!(error = ?e, "Daemon exited with error"))
        }
    }
}
