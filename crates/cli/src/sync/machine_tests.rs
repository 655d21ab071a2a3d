// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the connection state machine.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use super::machine::{ConnectionState, Machine, RetryCounter, SyncStatus};
use super::reconnect::{ReconnectDecision, ReconnectPolicy};
use yare::parameterized;

fn policy(max: u32) -> ReconnectPolicy {
    ReconnectPolicy::new(max, Duration::from_millis(1500))
}

fn open_machine(max: u32) -> (Machine, u64) {
    let mut machine = Machine::new(max);
    let generation = machine.start_flow().unwrap();
    assert!(machine.opened(generation));
    (machine, generation)
}

#[test]
fn initial_state() {
    let machine = Machine::new(5);
    assert_eq!(machine.state(), ConnectionState::Idle);
    assert_eq!(machine.retry().count(), 0);
    assert_eq!(machine.status(), SyncStatus::default());
    assert!(!machine.is_expiring());
}

#[test]
fn start_flow_is_noop_while_active() {
    let mut machine = Machine::new(5);
    let generation = machine.start_flow().unwrap();
    assert_eq!(machine.state(), ConnectionState::Connecting);

    // Connecting
    assert!(machine.start_flow().is_none());

    // Open
    machine.opened(generation);
    assert!(machine.start_flow().is_none());

    // Reconnecting
    machine.transient_failure(generation, &policy(5)).unwrap();
    assert_eq!(machine.state(), ConnectionState::Reconnecting);
    assert!(machine.start_flow().is_none());
    assert_eq!(machine.generation(), generation);
}

#[parameterized(
    after_expiry = { true },
    after_logout = { false },
)]
fn start_flow_restarts_terminal_states(expire: bool) {
    let (mut machine, generation) = open_machine(5);
    if expire {
        assert!(machine.begin_expiry(Some(generation)));
        machine.finish_expiry();
    } else {
        machine.close_by_user();
    }

    let next = machine.start_flow().unwrap();
    assert!(next > generation);
    assert_eq!(machine.state(), ConnectionState::Connecting);
    assert_eq!(machine.retry().count(), 0);
}

#[test]
fn open_resets_retry_counter() {
    let mut machine = Machine::new(5);
    let p = policy(5);
    let mut generation = machine.start_flow().unwrap();
    for _ in 0..3 {
        machine.transient_failure(generation, &p).unwrap();
        generation = machine.reconnect_due(generation).unwrap();
    }
    assert_eq!(machine.retry().count(), 3);

    assert!(machine.opened(generation));
    assert_eq!(machine.retry().count(), 0);
    assert_eq!(machine.state(), ConnectionState::Open);
    assert!(machine.status().connection);
}

#[test]
fn last_allowed_failure_gives_up() {
    let mut machine = Machine::new(5);
    let p = policy(5);
    let mut generation = machine.start_flow().unwrap();
    for _ in 0..4 {
        let decision = machine.transient_failure(generation, &p).unwrap();
        assert!(matches!(decision, ReconnectDecision::Retry { .. }));
        generation = machine.reconnect_due(generation).unwrap();
    }
    assert_eq!(machine.retry().count(), 4);

    let decision = machine.transient_failure(generation, &p).unwrap();
    assert_eq!(decision, ReconnectDecision::GiveUp { attempts: 5 });
    assert_ne!(machine.state(), ConnectionState::Reconnecting);

    assert!(machine.begin_expiry(Some(generation)));
    assert_eq!(machine.state(), ConnectionState::Expired);
    assert_eq!(machine.retry().count(), 5);
    assert!(machine.status().session_expired);
}

#[test]
fn stale_generation_is_ignored() {
    let (mut machine, generation) = open_machine(5);
    machine.close_by_user();

    assert!(!machine.opened(generation));
    assert!(machine.transient_failure(generation, &policy(5)).is_none());
    assert!(machine.reconnect_due(generation).is_none());
    assert!(!machine.begin_expiry(Some(generation)));
    assert_eq!(machine.state(), ConnectionState::ClosedByUser);
}

#[test]
fn reconnect_timer_after_expiry_is_stale() {
    let (mut machine, generation) = open_machine(5);
    machine.transient_failure(generation, &policy(5)).unwrap();
    assert_eq!(machine.state(), ConnectionState::Reconnecting);

    // External expiry while the timer is pending
    assert!(machine.begin_expiry(None));

    assert!(machine.reconnect_due(generation).is_none());
    assert_eq!(machine.state(), ConnectionState::Expired);
}

#[test]
fn begin_expiry_collapses_duplicates() {
    let (mut machine, generation) = open_machine(5);

    assert!(machine.begin_expiry(Some(generation)));
    assert!(machine.is_expiring());
    // Same link, second trigger
    assert!(!machine.begin_expiry(Some(generation)));
    // External trigger while in progress
    assert!(!machine.begin_expiry(None));

    machine.finish_expiry();
    // Already expired
    assert!(!machine.begin_expiry(None));
}

#[test]
fn close_by_user_from_active_and_idle() {
    let (mut machine, _) = open_machine(5);
    assert_eq!(machine.close_by_user(), ConnectionState::Open);
    assert_eq!(machine.state(), ConnectionState::ClosedByUser);
    assert_eq!(machine.status(), SyncStatus::default());

    let mut idle = Machine::new(5);
    assert_eq!(idle.close_by_user(), ConnectionState::Idle);
    assert_eq!(idle.state(), ConnectionState::Idle);
}

#[test]
fn retry_counter_is_bounded() {
    let mut counter = RetryCounter::new(2);
    assert_eq!(counter.record_failure(), 1);
    assert!(!counter.is_exhausted());
    assert_eq!(counter.record_failure(), 2);
    assert!(counter.is_exhausted());
    assert_eq!(counter.record_failure(), 2);
    counter.reset();
    assert_eq!(counter.count(), 0);
    assert_eq!(counter.max(), 2);
}

#[parameterized(
    idle = { ConnectionState::Idle, "idle", false },
    connecting = { ConnectionState::Connecting, "connecting", true },
    open = { ConnectionState::Open, "open", true },
    reconnecting = { ConnectionState::Reconnecting, "reconnecting", true },
    expired = { ConnectionState::Expired, "expired", false },
    closed = { ConnectionState::ClosedByUser, "closed", false },
)]
fn state_labels(state: ConnectionState, label: &str, active: bool) {
    assert_eq!(state.to_string(), label);
    assert_eq!(state.is_active(), active);
}
