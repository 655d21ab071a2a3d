// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use chansync::Cli;
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    if let Err(e) = chansync::run(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Logs to stderr; `RUST_LOG` wins over `--verbose`.
fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
