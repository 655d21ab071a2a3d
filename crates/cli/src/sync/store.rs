// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mirrored key-value store.
//!
//! The store is the flush target of the batching pipeline. It holds the latest
//! serialized payload per channel for the lifetime of the client; nothing is
//! persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Sink for flushed channel updates.
///
/// Writes are synchronous and must not fail for valid input.
pub trait MirroredStore: Send + Sync {
    fn set(&self, channel: &str, value: String);
}

/// In-memory mirrored store.
///
/// Cloning yields another handle to the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value for a channel.
    pub fn get(&self, channel: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }

    /// Number of channels held.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total `set` calls since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Sorted copy of all entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl MirroredStore for MemoryStore {
    fn set(&self, channel: &str, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.to_string(), value);
        self.writes.fetch_add(1, Ordering::AcqRel);
    }
}
