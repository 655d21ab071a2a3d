// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection configuration and sync tuning.
//!
//! Configuration is read from a TOML file with two tables:
//! - `[connection]`: where and as whom to connect ([`ConnectionConfig`])
//! - `[sync]`: retry, batching and subscription knobs ([`SyncTuning`])
//!
//! Every `[sync]` field has a default, so a file only needs `[connection]`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Immutable per-connect configuration supplied by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket endpoint (`ws://...` or `wss://...`).
    pub endpoint: String,
    /// Optional sub-protocols offered during the handshake.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    /// Network/environment label, echoed as `webfix` in subscribe frames.
    pub network: String,
    /// Display title, used for log context only.
    #[serde(default)]
    pub title: String,
    /// Process identifier used as the credential when no session record exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
}

impl ConnectionConfig {
    /// Creates a config for the given endpoint and network label.
    pub fn new(endpoint: impl Into<String>, network: impl Into<String>) -> Self {
        ConnectionConfig {
            endpoint: endpoint.into(),
            protocols: Vec::new(),
            network: network.into(),
            title: String::new(),
            process_id: None,
        }
    }

    /// Sets the fallback process identifier.
    pub fn with_process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = Some(process_id.into());
        self
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Validates the endpoint scheme and the network label.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(Error::FieldEmpty { field: "endpoint" });
        }
        let has_host = endpoint
            .strip_prefix("ws://")
            .or_else(|| endpoint.strip_prefix("wss://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_host {
            return Err(Error::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.network.trim().is_empty() {
            return Err(Error::FieldEmpty { field: "network" });
        }
        Ok(())
    }
}

/// Retry, batching and subscription settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTuning {
    /// Consecutive transient failures tolerated before the session is expired.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay before each reconnect attempt (milliseconds).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Store writes per scheduling turn during a flush.
    #[serde(default = "default_flush_chunk_size")]
    pub flush_chunk_size: usize,
    /// Delay before reporting expiry when no credential is available (milliseconds).
    #[serde(default = "default_expiry_notice_delay_ms")]
    pub expiry_notice_delay_ms: u64,
    /// Channels subscribed to on every open.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Close codes treated as session expiry.
    #[serde(default = "default_expiry_close_codes")]
    pub expiry_close_codes: Vec<u16>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1500
}

fn default_flush_chunk_size() -> usize {
    10
}

fn default_expiry_notice_delay_ms() -> u64 {
    500
}

fn default_channels() -> Vec<String> {
    vec!["stats".to_string(), "workers".to_string()]
}

fn default_expiry_close_codes() -> Vec<u16> {
    // 1006: abnormal closure
    vec![1006]
}

impl Default for SyncTuning {
    fn default() -> Self {
        SyncTuning {
            max_attempts: default_max_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            flush_chunk_size: default_flush_chunk_size(),
            expiry_notice_delay_ms: default_expiry_notice_delay_ms(),
            channels: default_channels(),
            expiry_close_codes: default_expiry_close_codes(),
        }
    }
}

impl SyncTuning {
    /// Delay before a reconnect attempt.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Delay before a missing-credential expiry notice.
    pub fn expiry_notice_delay(&self) -> Duration {
        Duration::from_millis(self.expiry_notice_delay_ms)
    }

    /// Rejects settings that would disable retries, batching or subscriptions.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::MustBePositive {
                field: "max_attempts",
            });
        }
        if self.flush_chunk_size == 0 {
            return Err(Error::MustBePositive {
                field: "flush_chunk_size",
            });
        }
        if self.channels.is_empty() {
            return Err(Error::FieldEmpty { field: "channels" });
        }
        if self.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::FieldEmpty {
                field: "channel name",
            });
        }
        Ok(())
    }
}

/// On-disk configuration file (`config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Connection table; optional so flags can supply it instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionConfig>,
    /// Sync tuning table.
    #[serde(default)]
    pub sync: SyncTuning,
}

impl ConfigFile {
    /// Parses a configuration document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
