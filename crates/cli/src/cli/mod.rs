// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};

pub use args::TargetArgs;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "chansync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror server push channels into a local store over WebSocket")]
#[command(
    long_about = "Mirror server push channels into a local store over WebSocket.\n\n\
    Subscribes to the configured channels, keeps the latest value of each, and\n\
    reconnects on transient failures until the session expires."
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate configuration and credentials without connecting
    #[command(after_help = "\
Examples:
  chansync check                                   Use the default config file
  chansync check --config ./config.toml -o json    Machine-readable report
  chansync check --endpoint wss://host/ws --network mainnet")]
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Connect and mirror channels until interrupted or the session expires
    #[command(after_help = "\
Examples:
  chansync watch                        Use the default config file
  chansync watch --title Console -v     Debug logging with a log title
  chansync watch -o json                Print the mirrored store as JSON on exit")]
    Watch {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format for the final store dump
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}
