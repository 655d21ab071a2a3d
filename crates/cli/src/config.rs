// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings resolution.
//!
//! Settings come from `config.toml` (default `<config dir>/chansync/`) and
//! are then overridden by command-line flags. The credential record lives in
//! `<data dir>/chansync/credentials.json` unless `--credentials` says
//! otherwise.

use std::path::{Path, PathBuf};

use chansync_core::{ConfigFile, ConnectionConfig, SyncTuning};

use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "chansync";
const CONFIG_FILE_NAME: &str = "config.toml";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Default location of the credential record.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(CREDENTIALS_FILE_NAME))
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub network: Option<String>,
    pub title: Option<String>,
    pub process_id: Option<String>,
    pub protocols: Vec<String>,
    pub credentials: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Config file actually read, if any.
    pub config_path: Option<PathBuf>,
    pub connection: ConnectionConfig,
    pub tuning: SyncTuning,
    pub credentials_path: PathBuf,
}

impl Settings {
    /// Loads the config file and applies overrides.
    ///
    /// An explicit `config_path` must exist; the default one is optional.
    pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let (file, config_path) = match config_path {
            Some(path) => (ConfigFile::load(path)?, Some(path.to_path_buf())),
            None => match default_config_path().filter(|path| path.exists()) {
                Some(path) => (ConfigFile::load(&path)?, Some(path)),
                None => (ConfigFile::default(), None),
            },
        };

        let connection = merge_connection(file.connection, overrides)?;
        connection.validate()?;
        file.sync.validate()?;

        let credentials_path = match &overrides.credentials {
            Some(path) => path.clone(),
            None => default_credentials_path().ok_or(Error::NoStandardDir("data"))?,
        };

        Ok(Settings {
            config_path,
            connection,
            tuning: file.sync,
            credentials_path,
        })
    }
}

fn merge_connection(
    file: Option<ConnectionConfig>,
    overrides: &Overrides,
) -> Result<ConnectionConfig> {
    let endpoint = overrides
        .endpoint
        .clone()
        .or_else(|| file.as_ref().map(|c| c.endpoint.clone()))
        .ok_or(Error::MissingSetting {
            field: "endpoint",
            flag: "endpoint",
        })?;
    let network = overrides
        .network
        .clone()
        .or_else(|| file.as_ref().map(|c| c.network.clone()))
        .ok_or(Error::MissingSetting {
            field: "network",
            flag: "network",
        })?;

    let mut connection = match file {
        Some(mut base) => {
            base.endpoint = endpoint;
            base.network = network;
            base
        }
        None => ConnectionConfig::new(endpoint, network),
    };
    if let Some(title) = &overrides.title {
        connection.title = title.clone();
    }
    if let Some(process_id) = &overrides.process_id {
        connection.process_id = Some(process_id.clone());
    }
    if !overrides.protocols.is_empty() {
        connection.protocols = overrides.protocols.clone();
    }
    Ok(connection)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
