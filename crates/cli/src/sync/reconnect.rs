// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnection policy.
//!
//! Fixed delay, bounded attempts. The counter is incremented on every
//! transient failure and reset on every successful open; reaching the limit
//! escalates to session expiry instead of another attempt.

use std::time::Duration;

use chansync_core::SyncTuning;

use super::machine::RetryCounter;

/// What to do after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again after `delay`; this will be attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Attempts exhausted; expire the session.
    GiveUp { attempts: u32 },
}

/// Bounded, fixed-delay retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        ReconnectPolicy {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_tuning(tuning: &SyncTuning) -> Self {
        Self::new(tuning.max_attempts, tuning.reconnect_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// A counter sized for this policy.
    pub fn counter(&self) -> RetryCounter {
        RetryCounter::new(self.max_attempts)
    }

    /// Records a failure and decides whether to retry.
    pub fn on_failure(&self, retry: &mut RetryCounter) -> ReconnectDecision {
        let attempts = retry.record_failure();
        if attempts >= self.max_attempts {
            ReconnectDecision::GiveUp { attempts }
        } else {
            ReconnectDecision::Retry {
                attempt: attempts,
                delay: self.delay,
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_tuning(&SyncTuning::default())
    }
}
