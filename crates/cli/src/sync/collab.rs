// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborators the coordinator reports to.
//!
//! The coordinator owns none of these; the embedding application supplies
//! them. [`AuthHandler`] drives the user-facing side of a session expiry and
//! [`AppStatus`] receives the sync error text and change notifications.

use std::future::Future;
use std::pin::Pin;

use chansync_core::ChannelUpdate;
use sha2::{Digest, Sha256};

/// Boxed future returned by [`AuthHandler::reset_auth`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Authentication side of the application.
pub trait AuthHandler: Send + Sync {
    /// Resets authentication state after the session is torn down.
    fn reset_auth(&self) -> AuthFuture<'_>;

    /// Shows or hides the "session expired" notice.
    fn set_session_expired_modal(&self, visible: bool);
}

/// Application status holder.
pub trait AppStatus: Send + Sync {
    /// Sets (`Some`) or clears (`None`) the user-visible sync error.
    fn set_sync_error(&self, error: Option<String>);

    /// Notifies that mirrored data changed; `hash` identifies the update.
    fn mark_data_as_updated(&self, hash: &str);
}

/// Content hash passed to [`AppStatus::mark_data_as_updated`].
///
/// SHA-256 over the channel name and the serialized payload, hex encoded.
pub fn update_hash(update: &ChannelUpdate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(update.channel.as_bytes());
    hasher.update(b"\n");
    hasher.update(update.payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Auth handler that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuth;

impl AuthHandler for NoopAuth {
    fn reset_auth(&self) -> AuthFuture<'_> {
        Box::pin(async {})
    }

    fn set_session_expired_modal(&self, _visible: bool) {}
}

/// Status holder that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl AppStatus for LogStatus {
    fn set_sync_error(&self, error: Option<String>) {
        match error {
            Some(error) => tracing::warn!(%error, "sync error"),
            None => tracing::debug!("sync error cleared"),
        }
    }

    fn mark_data_as_updated(&self, hash: &str) {
        tracing::debug!(hash, "data updated");
    }
}
