// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chansync - Mirror server push channels into a local store.
//!
//! This crate provides the WebSocket client behind the `chansync` binary:
//! a coordinator that subscribes to a fixed set of channels, batches the
//! updates into a mirrored store, reconnects on transient failures and tears
//! the session down when the server rejects it.
//!
//! # Main Components
//!
//! - [`sync::SyncCoordinator`] - connection lifecycle and update routing
//! - [`sync::BatchPipeline`] - last-write-wins batching in front of the store
//! - [`sync::Transport`] - injectable transport seam
//! - [`config::Settings`] - config file plus command-line overrides
//! - [`Error`] - Error types for all operations
//!
//! # Embedding
//!
//! ```rust,ignore
//! use chansync::sync::{Collaborators, MemoryStore, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::websocket(tuning, collaborators);
//! coordinator.connect(connection);
//! // ...
//! coordinator.reset_websocket_state().await;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, TargetArgs};
pub use error::{Error, Result};

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Check { target, output } => commands::check::run(target, output),
        Command::Watch { target, output } => commands::watch::run(target, output),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
