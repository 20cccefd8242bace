//! Command line interface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meetscribe", about = "Meeting bot scheduler and transcript tracker")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Print the version and exit
    Version,
}
