// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine.
//!
//! [`Machine`] holds the connection state, the retry counter and the link
//! generation, and changes them only through the transition methods below.
//! The coordinator performs the side effects each transition calls for.
//!
//! Every physical link, reconnect timer and expiry notice is tagged with the
//! generation current when it was issued. Any transition that supersedes it
//! bumps the generation, so late callbacks are recognised as stale and ignored.

use std::fmt;

use super::reconnect::{ReconnectDecision, ReconnectPolicy};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No flow started yet, or reset after logout with nothing active.
    Idle,
    /// Transport is being opened (or expiry is pending for lack of credentials).
    Connecting,
    /// Subscribed and receiving updates.
    Open,
    /// Waiting for the reconnect delay to elapse.
    Reconnecting,
    /// Session rejected or retries exhausted; terminal until the next connect.
    Expired,
    /// Explicit logout.
    ClosedByUser,
}

impl ConnectionState {
    /// True while a flow owns (or is about to own) a transport.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Reconnecting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Expired => "expired",
            ConnectionState::ClosedByUser => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded count of consecutive transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    count: u32,
    max: u32,
}

impl RetryCounter {
    pub fn new(max: u32) -> Self {
        RetryCounter { count: 0, max }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Counts one more failure (never beyond `max`) and returns the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.count = (self.count + 1).min(self.max);
        self.count
    }

    pub fn is_exhausted(&self) -> bool {
        self.count >= self.max
    }
}

/// Externally observable status pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Subscribed and receiving.
    pub connection: bool,
    /// The session must be re-established by the user.
    pub session_expired: bool,
}

/// State, retry counter and generation, changed only by transitions.
#[derive(Debug)]
pub struct Machine {
    state: ConnectionState,
    retry: RetryCounter,
    generation: u64,
    expiring: bool,
}

impl Machine {
    pub fn new(max_attempts: u32) -> Self {
        Machine {
            state: ConnectionState::Idle,
            retry: RetryCounter::new(max_attempts),
            generation: 0,
            expiring: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry(&self) -> RetryCounter {
        self.retry
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a teardown has begun and its async tail has not finished.
    #[cfg(test)]
    pub fn is_expiring(&self) -> bool {
        self.expiring
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            connection: self.state == ConnectionState::Open,
            session_expired: self.state == ConnectionState::Expired,
        }
    }

    fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// `connect()`: starts a fresh flow unless one is already active.
    ///
    /// Returns the generation of the new flow.
    pub fn start_flow(&mut self) -> Option<u64> {
        if self.state.is_active() {
            return None;
        }
        self.retry.reset();
        self.expiring = false;
        self.state = ConnectionState::Connecting;
        Some(self.advance())
    }

    /// Transport opened or an update arrived. Idempotent.
    ///
    /// Returns `false` for a stale generation.
    pub fn opened(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = ConnectionState::Open;
        self.retry.reset();
        true
    }

    /// A transient close/error on the current link.
    ///
    /// On `Retry` the state becomes `Reconnecting`; on `GiveUp` the caller
    /// must take the expiry path. `None` for a stale generation.
    pub fn transient_failure(
        &mut self,
        generation: u64,
        policy: &ReconnectPolicy,
    ) -> Option<ReconnectDecision> {
        if !self.is_current(generation) || !self.state.is_active() {
            return None;
        }
        let decision = policy.on_failure(&mut self.retry);
        if let ReconnectDecision::Retry { .. } = decision {
            self.state = ConnectionState::Reconnecting;
        }
        Some(decision)
    }

    /// The reconnect delay elapsed.
    ///
    /// Returns the generation for the new link, or `None` if the timer was
    /// superseded (expiry, logout, a newer flow).
    pub fn reconnect_due(&mut self, generation: u64) -> Option<u64> {
        if !self.is_current(generation) || self.state != ConnectionState::Reconnecting {
            return None;
        }
        self.state = ConnectionState::Connecting;
        Some(self.advance())
    }

    /// Starts session teardown.
    ///
    /// `generation` is the trigger's generation, or `None` for an external
    /// request. Returns `false` when the trigger is stale, a teardown is
    /// already running, or the session is already expired.
    pub fn begin_expiry(&mut self, generation: Option<u64>) -> bool {
        if generation.is_some_and(|g| !self.is_current(g)) {
            return false;
        }
        if self.expiring || self.state == ConnectionState::Expired {
            return false;
        }
        self.expiring = true;
        self.state = ConnectionState::Expired;
        self.advance();
        true
    }

    /// The async tail of a teardown completed.
    pub fn finish_expiry(&mut self) {
        self.expiring = false;
    }

    /// Explicit logout. Returns the state before the reset.
    pub fn close_by_user(&mut self) -> ConnectionState {
        let previous = self.state;
        self.retry.reset();
        self.state = if previous.is_active() {
            ConnectionState::ClosedByUser
        } else {
            ConnectionState::Idle
        };
        self.advance();
        previous
    }
}
