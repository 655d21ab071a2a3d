// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.
//!
//! Flattened into every command that resolves a connection target.

use std::path::PathBuf;

use clap::Args;

use crate::config::Overrides;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Where the configuration comes from and what to override.
#[derive(Args, Clone, Debug, Default)]
pub struct TargetArgs {
    /// Config file (default: <config dir>/chansync/config.toml)
    #[arg(long, short = 'c', value_name = "path")]
    pub config: Option<PathBuf>,

    /// WebSocket endpoint (ws:// or wss://)
    #[arg(long, value_parser = non_empty_string)]
    pub endpoint: Option<String>,

    /// Network label sent with every subscription
    #[arg(long, value_parser = non_empty_string)]
    pub network: Option<String>,

    /// Title used in log output
    #[arg(long)]
    pub title: Option<String>,

    /// Process identifier used when no credential record exists
    #[arg(long, value_parser = non_empty_string)]
    pub process_id: Option<String>,

    /// Credential record (default: <data dir>/chansync/credentials.json)
    #[arg(long, value_name = "path")]
    pub credentials: Option<PathBuf>,

    /// WebSocket sub-protocol to offer (repeatable)
    #[arg(long = "protocol", value_name = "name")]
    pub protocols: Vec<String>,
}

impl TargetArgs {
    /// Splits into the config path and the flag overrides.
    pub fn into_parts(self) -> (Option<PathBuf>, Overrides) {
        let overrides = Overrides {
            endpoint: self.endpoint,
            network: self.network,
            title: self.title,
            process_id: self.process_id,
            protocols: self.protocols,
            credentials: self.credentials,
        };
        (self.config, overrides)
    }
}
