// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for chansync-core operations.

use thiserror::Error;

/// All possible errors that can occur in chansync-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid endpoint '{0}'\n  hint: the endpoint must start with ws:// or wss://")]
    InvalidEndpoint(String),

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A specialized Result type for chansync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
