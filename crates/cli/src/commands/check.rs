// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `chansync check`: resolve settings and credentials without connecting.

use serde::Serialize;

use chansync_core::{resolve_session, CredentialStore, FileCredentialStore};

use crate::cli::{OutputFormat, TargetArgs};
use crate::config::Settings;
use crate::error::Result;

/// Credential source label when nothing usable was found.
const NO_CREDENTIAL: &str = "none";

/// What a `watch` with the same flags would use.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub config_path: Option<String>,
    pub endpoint: String,
    pub network: String,
    pub title: String,
    pub protocols: Vec<String>,
    pub channels: Vec<String>,
    pub max_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub flush_chunk_size: usize,
    pub credentials_path: String,
    pub credential_source: &'static str,
}

impl CheckReport {
    pub fn build(settings: &Settings, credentials: &dyn CredentialStore) -> Self {
        let credential_source = resolve_session(credentials, &settings.connection)
            .map(|session| session.source.as_str())
            .unwrap_or(NO_CREDENTIAL);

        CheckReport {
            config_path: settings
                .config_path
                .as_ref()
                .map(|p| p.display().to_string()),
            endpoint: settings.connection.endpoint.clone(),
            network: settings.connection.network.clone(),
            title: settings.connection.title.clone(),
            protocols: settings.connection.protocols.clone(),
            channels: settings.tuning.channels.clone(),
            max_attempts: settings.tuning.max_attempts,
            reconnect_delay_ms: settings.tuning.reconnect_delay_ms,
            flush_chunk_size: settings.tuning.flush_chunk_size,
            credentials_path: settings.credentials_path.display().to_string(),
            credential_source,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let config = self.config_path.as_deref().unwrap_or("(defaults)");
        out.push_str(&format!("config:      {}\n", config));
        out.push_str(&format!("endpoint:    {}\n", self.endpoint));
        out.push_str(&format!("network:     {}\n", self.network));
        if !self.title.is_empty() {
            out.push_str(&format!("title:       {}\n", self.title));
        }
        if !self.protocols.is_empty() {
            out.push_str(&format!("protocols:   {}\n", self.protocols.join(", ")));
        }
        out.push_str(&format!("channels:    {}\n", self.channels.join(", ")));
        out.push_str(&format!(
            "retries:     {} attempts, {}ms apart\n",
            self.max_attempts, self.reconnect_delay_ms
        ));
        out.push_str(&format!("flush chunk: {}\n", self.flush_chunk_size));
        out.push_str(&format!(
            "credential:  {} ({})\n",
            self.credential_source, self.credentials_path
        ));
        out
    }
}

pub fn run(target: TargetArgs, output: OutputFormat) -> Result<()> {
    let (config_path, overrides) = target.into_parts();
    let settings = Settings::resolve(config_path.as_deref(), &overrides)?;
    let credentials = FileCredentialStore::new(&settings.credentials_path);
    let report = CheckReport::build(&settings, &credentials);

    match output {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    if report.credential_source == NO_CREDENTIAL {
        tracing::warn!("no usable credential; watch would expire the session immediately");
    }
    Ok(())
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
