// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! chansync-core: Shared library for the chansync client
//!
//! This crate provides the wire protocol, configuration, credential
//! resolution and close classification used by the chansync client. It has
//! no async runtime dependency.

pub mod close;
pub mod config;
pub mod credential;
pub mod error;
pub mod protocol;

pub use close::{CloseEvent, CloseKind};
pub use config::{ConfigFile, ConnectionConfig, SyncTuning};
pub use credential::{
    resolve_session, resolve_token, CredentialSource, CredentialStore, FileCredentialStore,
    MemoryCredentialStore, Session,
};
pub use error::{Error, Result};
pub use protocol::{ChannelUpdate, Envelope, SubscribeFrame, UpdateFlags};
