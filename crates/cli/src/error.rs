// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors surfaced by the chansync command line.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] chansync_core::Error),

    #[error("{field} is not configured\n  hint: set it under [connection] in the config file or pass --{flag}")]
    MissingSetting {
        field: &'static str,
        flag: &'static str,
    },

    #[error("cannot locate the {0} directory\n  hint: pass --config and --credentials explicitly")]
    NoStandardDir(&'static str),

    #[error("failed to start runtime: {0}")]
    Runtime(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for chansync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
