// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message batching pipeline.
//!
//! Inbound channel updates are coalesced into a [`PendingBatch`] (latest
//! payload per channel wins) and written to the mirrored store by a spawned
//! flush task. The flush never writes on the receive path and never writes
//! more than one chunk per scheduling turn, so a burst of updates cannot
//! starve the socket task's keep-alive handling.
//!
//! ```text
//!  ingest ──► PendingBatch ──(flush turn: snapshot)──► in-flight ──(chunk/turn)──► store
//!                  │                                       │
//!                  └────────────── flush_now() ────────────┘  (teardown: drain all, no yield)
//! ```
//!
//! `flush_now` drains the in-flight queue before the pending batch, so a
//! chunked flush interrupted by teardown can never write a stale value after
//! a newer one.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::store::MirroredStore;

/// Latest serialized payload per channel, in first-arrival order.
#[derive(Debug, Default)]
pub struct PendingBatch {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an update, replacing any earlier payload for the channel.
    pub fn insert(&mut self, channel: String, payload: String) {
        match self.index.get(&channel) {
            Some(&slot) => self.entries[slot].1 = payload,
            None => {
                self.index.insert(channel.clone(), self.entries.len());
                self.entries.push((channel, payload));
            }
        }
    }

    /// Removes and returns every entry.
    pub fn take(&mut self) -> Vec<(String, String)> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }

    pub fn get(&self, channel: &str) -> Option<&str> {
        self.index
            .get(channel)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct BatchState {
    pending: PendingBatch,
    /// Snapshot taken by the running flush, written chunk by chunk.
    in_flight: VecDeque<(String, String)>,
    flush_scheduled: bool,
}

/// Coalescing, chunked writer in front of the mirrored store.
///
/// Cloning yields another handle to the same pipeline.
#[derive(Clone)]
pub struct BatchPipeline {
    state: Arc<Mutex<BatchState>>,
    store: Arc<dyn MirroredStore>,
    chunk_size: usize,
}

impl BatchPipeline {
    /// Creates a pipeline writing `chunk_size` entries per scheduling turn.
    pub fn new(store: Arc<dyn MirroredStore>, chunk_size: usize) -> Self {
        BatchPipeline {
            state: Arc::new(Mutex::new(BatchState::default())),
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Coalesces an update into the pending batch. Never touches the store.
    pub fn ingest(&self, channel: String, payload: String) {
        self.lock().pending.insert(channel, payload);
    }

    /// Number of updates not yet written (pending plus in-flight).
    pub fn pending_len(&self) -> usize {
        let state = self.lock();
        state.pending.len() + state.in_flight.len()
    }

    /// Whether a flush task is scheduled but has not taken its snapshot yet.
    pub fn is_flush_scheduled(&self) -> bool {
        self.lock().flush_scheduled
    }

    /// Schedules a flush on the next scheduling turn.
    ///
    /// Returns `false` if a flush is already scheduled. Must be called from
    /// within a tokio runtime.
    pub fn schedule_flush(&self) -> bool {
        {
            let mut state = self.lock();
            if state.flush_scheduled {
                return false;
            }
            state.flush_scheduled = true;
        }

        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run_flush().await });
        true
    }

    async fn run_flush(self) {
        // Defer to the next turn so a burst of ingests coalesces first
        tokio::task::yield_now().await;

        {
            let mut state = self.lock();
            state.flush_scheduled = false;
            let snapshot = state.pending.take();
            trace!(entries = snapshot.len(), "flush snapshot taken");
            state.in_flight.extend(snapshot);
        }

        loop {
            let written = self.write_chunk();
            if written == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Writes at most one chunk of in-flight entries; returns how many.
    fn write_chunk(&self) -> usize {
        let mut state = self.lock();
        let take = self.chunk_size.min(state.in_flight.len());
        for (channel, payload) in state.in_flight.drain(..take) {
            self.store.set(&channel, payload);
        }
        take
    }

    /// Drains everything to the store immediately, without chunking or yielding.
    ///
    /// Used on teardown paths (logout, session expiry, reconnect) so no
    /// update is dropped. Returns the number of entries written.
    pub fn flush_now(&self) -> usize {
        let mut state = self.lock();
        let mut written = 0;
        while let Some((channel, payload)) = state.in_flight.pop_front() {
            self.store.set(&channel, payload);
            written += 1;
        }
        for (channel, payload) in state.pending.take() {
            self.store.set(&channel, payload);
            written += 1;
        }
        if written > 0 {
            debug!(written, "pending updates flushed synchronously");
        }
        written
    }
}
