// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Close/error classification.
//!
//! Every way a connection can end is reduced to a [`CloseEvent`] and then
//! classified into exactly one [`CloseKind`]. Session expiry is checked before
//! anything else that could look like a plain network failure.

use std::fmt;

/// Close code for a normal, locally requested shutdown.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Close reason attached to explicit logouts.
pub const USER_CLOSE_REASON: &str = "user-initiated";

/// Close reason attached when the client tears down an expired session.
pub const EXPIRED_CLOSE_REASON: &str = "session-expired";

/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Reason fragments that mean the server rejected the session.
const SESSION_REASON_MARKERS: &[&str] = &[
    "expire",
    "invalid",
    "session",
    "unauthorized",
    "unauthorised",
    "token",
];

/// Error-text fragments that mean the server refused the credential.
///
/// Transport errors carry free-form text (I/O, TLS, HTTP), so only
/// authorization refusals count there.
const AUTH_ERROR_MARKERS: &[&str] = &["unauthorized", "unauthorised", "forbidden"];

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close code, absent for transport errors and failed opens.
    pub code: Option<u16>,
    /// Close reason or error text.
    pub reason: String,
}

impl CloseEvent {
    /// A close frame received from (or sent to) the peer.
    pub fn frame(code: u16, reason: impl Into<String>) -> Self {
        CloseEvent {
            code: Some(code),
            reason: reason.into(),
        }
    }

    /// A transport-level error without a close handshake.
    pub fn error(reason: impl Into<String>) -> Self {
        CloseEvent {
            code: None,
            reason: reason.into(),
        }
    }

    /// The close this client sends on logout.
    pub fn user_initiated() -> Self {
        Self::frame(NORMAL_CLOSE_CODE, USER_CLOSE_REASON)
    }

    /// Classifies the event; `expiry_codes` lists codes that mean session expiry.
    pub fn classify(&self, expiry_codes: &[u16]) -> CloseKind {
        if self.code == Some(NORMAL_CLOSE_CODE) && self.reason == USER_CLOSE_REASON {
            return CloseKind::UserInitiated;
        }
        if self.code.is_some_and(|code| expiry_codes.contains(&code)) {
            return CloseKind::SessionExpired;
        }
        let reason = self.reason.to_lowercase();
        let markers = match self.code {
            Some(_) => SESSION_REASON_MARKERS,
            None => AUTH_ERROR_MARKERS,
        };
        if markers.iter().any(|m| reason.contains(m)) {
            return CloseKind::SessionExpired;
        }
        CloseKind::Transient
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.reason.is_empty()) {
            (Some(code), true) => write!(f, "closed with code {}", code),
            (Some(code), false) => write!(f, "closed with code {}: {}", code, self.reason),
            (None, _) => write!(f, "transport error: {}", self.reason),
        }
    }
}

/// Outcome of classifying a [`CloseEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Explicit logout; never reconnect.
    UserInitiated,
    /// Credential rejected; tear the session down.
    SessionExpired,
    /// Anything else; retry under the reconnection policy.
    Transient,
}

#[cfg(test)]
#[path = "close_tests.rs"]
mod tests;
