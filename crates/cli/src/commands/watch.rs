// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `chansync watch`: run a coordinator until Ctrl-C or session expiry.

use std::collections::BTreeMap;
use std::sync::Arc;

use chansync_core::FileCredentialStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{OutputFormat, TargetArgs};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::sync::{
    AuthFuture, AuthHandler, Collaborators, LogStatus, MemoryStore, SyncCoordinator,
};

/// Why the watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Interrupted,
    SessionExpired,
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::Interrupted => "interrupted",
            StopReason::SessionExpired => "session expired",
        }
    }
}

/// Final state printed on exit.
#[derive(Debug)]
pub struct WatchOutcome {
    pub reason: StopReason,
    pub stopped_at: DateTime<Utc>,
    pub channels: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    reason: StopReason,
    stopped_at: String,
    channels: BTreeMap<&'a str, Value>,
}

impl WatchOutcome {
    pub fn render(&self, output: OutputFormat) -> Result<String> {
        match output {
            OutputFormat::Text => {
                let mut out = String::new();
                for (channel, value) in &self.channels {
                    out.push_str(&format!("{}\t{}\n", channel, value));
                }
                Ok(out)
            }
            OutputFormat::Json => {
                let channels = self
                    .channels
                    .iter()
                    .map(|(channel, raw)| {
                        let value = serde_json::from_str(raw)
                            .unwrap_or_else(|_| Value::String(raw.clone()));
                        (channel.as_str(), value)
                    })
                    .collect();
                let json = JsonOutcome {
                    reason: self.reason,
                    stopped_at: self.stopped_at.to_rfc3339(),
                    channels,
                };
                Ok(format!("{}\n", serde_json::to_string_pretty(&json)?))
            }
        }
    }
}

/// Tells the user to log in again; there is no interactive auth to reset.
struct ConsoleAuth;

impl AuthHandler for ConsoleAuth {
    fn reset_auth(&self) -> AuthFuture<'_> {
        Box::pin(async {})
    }

    fn set_session_expired_modal(&self, visible: bool) {
        if visible {
            warn!("session expired; log in again to resume syncing");
        }
    }
}

pub fn run(target: TargetArgs, output: OutputFormat) -> Result<()> {
    let (config_path, overrides) = target.into_parts();
    let settings = Settings::resolve(config_path.as_deref(), &overrides)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(e.to_string()))?;
    let outcome = runtime.block_on(watch(settings));

    eprintln!("stopped: {}", outcome.reason.as_str());
    print!("{}", outcome.render(output)?);
    Ok(())
}

async fn watch(settings: Settings) -> WatchOutcome {
    let store = MemoryStore::new();
    let coordinator = SyncCoordinator::websocket(
        settings.tuning.clone(),
        Collaborators {
            credentials: Arc::new(FileCredentialStore::new(&settings.credentials_path)),
            auth: Arc::new(ConsoleAuth),
            status: Arc::new(LogStatus),
            store: Arc::new(store.clone()),
        },
    );
    let mut status = coordinator.subscribe();

    info!(
        endpoint = %settings.connection.endpoint,
        network = %settings.connection.network,
        "watching"
    );
    coordinator.connect(settings.connection);

    let reason = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break StopReason::Interrupted,
            changed = status.changed() => {
                if changed.is_err() {
                    break StopReason::Interrupted;
                }
                let current = *status.borrow_and_update();
                info!(
                    connected = current.connection,
                    state = %coordinator.state(),
                    retries = coordinator.retry_count(),
                    "status changed"
                );
                if current.session_expired {
                    break StopReason::SessionExpired;
                }
            }
        }
    };

    coordinator.reset_websocket_state().await;

    WatchOutcome {
        reason,
        stopped_at: Utc::now(),
        channels: store.snapshot(),
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
