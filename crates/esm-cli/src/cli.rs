//! CLI argument definitions.

use clap::Parser;

use crate::commands::Command;
use crate::connection::ConnectionArgs;

/// Poll and manage Efecte ESM DataCards.
#[derive(Parser, Debug)]
#[command(name = "esm")]
#[command(
    author,
    version = env!("ESM_VERSION"),
    long_version = concat!(env!("ESM_VERSION"), " (", env!("ESM_TARGET"), ")"),
    about,
    long_about = None
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}
