// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Channel synchronization over WebSocket.
//!
//! Keeps a local mirrored store in step with the server's push channels.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Coordinator  │────►│  Transport  │────►│   Channel   │
//! │(SyncCoord...) │◄────│   (trait)   │◄────│   Server    │
//! └───────────────┘     └─────────────┘     └─────────────┘
//!     │       │
//!     │       ▼
//!     │  ┌─────────────┐     ┌─────────────┐
//!     │  │  Pipeline   │────►│  Mirrored   │
//!     │  │ (batching)  │     │    Store    │
//!     │  └─────────────┘     └─────────────┘
//!     ▼
//! ┌─────────────┐
//! │   Machine   │  (state, retry counter, generation)
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - One live connection per coordinator; repeated `connect` calls are no-ops
//! - Bearer credential from the durable record, with a process-id fallback
//! - Last-write-wins batching with chunked, yielding store writes
//! - Fixed-delay reconnect with a bounded attempt count
//! - Session expiry detection (in-band errors, close codes and reasons)
//! - Injectable transport trait for testing

mod collab;
mod coordinator;
mod machine;
mod pipeline;
mod reconnect;
mod store;
mod transport;

pub use collab::{update_hash, AppStatus, AuthFuture, AuthHandler, LogStatus, NoopAuth};
pub use coordinator::{Collaborators, SyncCoordinator};
pub use machine::{ConnectionState, RetryCounter, SyncStatus};
pub use pipeline::{BatchPipeline, PendingBatch};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use store::{MemoryStore, MirroredStore};
pub use transport::{
    ConnectRequest, Connector, Transport, TransportError, TransportEvent, TransportFuture,
    TransportResult, WebSocketConnector, WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;




#[cfg(test)]
mod machine_tests;




#[cfg(test)]
mod integration_tests;
