//! esm - CLI for Efecte ESM DataCards.
//!
//! This is a thin wrapper over the `esm-rest` library: one-shot DataCard
//! operations plus a `poll` command that keeps its cursor in a state file
//! between runs.

mod cli;
mod commands;
mod connection;
mod fields;
mod output;
mod state;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match commands::handle(cli.command, &cli.connection).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_logging(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
