// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session credential resolution.
//!
//! The durable credential record is a small JSON document written by whoever
//! performs the login. The token is read from the top-level `token` field or,
//! for persisted-store layouts, from `state.token`. A record that is missing,
//! malformed or lacks a usable token resolves to "absent", never to an error;
//! the connection's process identifier is then used instead.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::error::Result;

/// Durable storage for the session credential record.
pub trait CredentialStore: Send + Sync {
    /// Reads the raw record, if one exists. Read failures count as absent.
    fn load(&self) -> Option<String>;

    /// Removes the record.
    fn clear(&self) -> Result<()>;
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Token from the durable record.
    Record,
    /// Fallback process identifier from the connection config.
    ProcessId,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Record => "record",
            CredentialSource::ProcessId => "process-id",
        }
    }
}

/// A credential ready for the transport handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub source: CredentialSource,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Extracts a non-empty token from a raw credential record.
pub fn resolve_token(record: Option<&str>) -> Option<String> {
    let parsed: Value = serde_json::from_str(record?).ok()?;
    let nested = parsed.get("state").and_then(|state| state.get("token"));
    let token = [parsed.get("token"), nested]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string);
    token
}

/// Resolves the credential for a connect attempt.
///
/// Reads the store every time; the record may have changed since the last
/// attempt (logout, renewal).
pub fn resolve_session(store: &dyn CredentialStore, config: &ConnectionConfig) -> Option<Session> {
    if let Some(token) = resolve_token(store.load().as_deref()) {
        return Some(Session {
            token,
            source: CredentialSource::Record,
        });
    }
    config
        .process_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| Session {
            token: id.to_string(),
            source: CredentialSource::ProcessId,
        })
}

/// Credential record stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory credential record, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(record: Option<String>) -> Self {
        MemoryCredentialStore {
            record: Mutex::new(record),
        }
    }

    /// Creates a store holding `{"token": <token>}`.
    pub fn with_token(token: &str) -> Self {
        Self::new(Some(serde_json::json!({ "token": token }).to_string()))
    }

    /// Replaces the stored record.
    pub fn set(&self, record: Option<String>) {
        if let Ok(mut guard) = self.record.lock() {
            *guard = record;
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.record.lock().ok().and_then(|guard| guard.clone())
    }

    fn clear(&self) -> Result<()> {
        self.set(None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
