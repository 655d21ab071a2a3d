// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chansync_core::{ConnectionConfig, MemoryCredentialStore};

use super::collab::{AppStatus, AuthFuture, AuthHandler};
use super::coordinator::Collaborators;
use super::store::MemoryStore;

/// Lets spawned tasks (flushes, link tasks) run to quiescence.
///
/// Under a paused clock this also auto-advances time by the same amount.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Connection settings pointing at a server nobody listens on.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new("ws://sync.invalid/ws", "testnet").with_title("test")
}

/// Auth handler recording every call.
#[derive(Default)]
pub struct RecordingAuth {
    modal: Mutex<Vec<bool>>,
    resets: AtomicUsize,
}

impl RecordingAuth {
    /// Every `set_session_expired_modal` argument, in order.
    pub fn modal_calls(&self) -> Vec<bool> {
        self.modal.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl AuthHandler for RecordingAuth {
    fn reset_auth(&self) -> AuthFuture<'_> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.resets.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn set_session_expired_modal(&self, visible: bool) {
        self.modal.lock().unwrap().push(visible);
    }
}

/// Status holder recording every call.
#[derive(Default)]
pub struct RecordingStatus {
    errors: Mutex<Vec<Option<String>>>,
    hashes: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn errors(&self) -> Vec<Option<String>> {
        self.errors.lock().unwrap().clone()
    }

    pub fn hashes(&self) -> Vec<String> {
        self.hashes.lock().unwrap().clone()
    }
}

impl AppStatus for RecordingStatus {
    fn set_sync_error(&self, error: Option<String>) {
        self.errors.lock().unwrap().push(error);
    }

    fn mark_data_as_updated(&self, hash: &str) {
        self.hashes.lock().unwrap().push(hash.to_string());
    }
}

/// Recording collaborators plus handles to inspect them.
pub struct TestCollaborators {
    pub credentials: Arc<MemoryCredentialStore>,
    pub auth: Arc<RecordingAuth>,
    pub status: Arc<RecordingStatus>,
    pub store: MemoryStore,
}

impl TestCollaborators {
    /// Collaborators whose credential record holds `token`.
    pub fn with_token(token: &str) -> Self {
        Self::new(MemoryCredentialStore::with_token(token))
    }

    /// Collaborators without any credential record.
    pub fn without_credentials() -> Self {
        Self::new(MemoryCredentialStore::default())
    }

    fn new(credentials: MemoryCredentialStore) -> Self {
        TestCollaborators {
            credentials: Arc::new(credentials),
            auth: Arc::new(RecordingAuth::default()),
            status: Arc::new(RecordingStatus::default()),
            store: MemoryStore::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            credentials: self.credentials.clone(),
            auth: self.auth.clone(),
            status: self.status.clone(),
            store: Arc::new(self.store.clone()),
        }
    }
}
