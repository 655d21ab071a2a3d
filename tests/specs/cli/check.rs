// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `chansync check`.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Runs with config and data dirs pointed into `temp` so the user's real
/// files are never read.
fn chansync(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("chansync");
    cmd.env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("HOME", temp.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(temp: &TempDir, content: &str) -> PathBuf {
    let path = temp.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

const CONFIG: &str = r#"
[connection]
endpoint = "wss://sync.example.net/ws"
network = "mainnet"
title = "Console"

[sync]
max_attempts = 3
reconnect_delay_ms = 250
"#;

#[test]
fn check_reports_file_settings() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, CONFIG);

    chansync(&temp)
        .arg("check")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("endpoint:    wss://sync.example.net/ws"))
        .stdout(predicate::str::contains("network:     mainnet"))
        .stdout(predicate::str::contains("channels:    stats, workers"))
        .stdout(predicate::str::contains("retries:     3 attempts, 250ms apart"))
        .stdout(predicate::str::contains("credential:  none"));
}

#[test]
fn check_json_with_credential_record() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, CONFIG);
    let credentials = temp.path().join("creds.json");
    fs::write(&credentials, r#"{"state":{"token":"abc"}}"#).unwrap();

    let output = chansync(&temp)
        .arg("check")
        .arg("--config")
        .arg(&config)
        .arg("--credentials")
        .arg(&credentials)
        .args(["-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["credential_source"], "record");
    assert_eq!(report["max_attempts"], 3);
    assert_eq!(report["title"], "Console");
}

#[test]
fn check_uses_default_config_location() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("config").join("chansync");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), CONFIG).unwrap();

    chansync(&temp)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("network:     mainnet"));
}

#[test]
fn check_flags_without_config_file() {
    let temp = TempDir::new().unwrap();

    chansync(&temp)
        .args([
            "check",
            "--endpoint",
            "ws://127.0.0.1:7000/ws",
            "--network",
            "devnet",
            "--process-id",
            "proc-9",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("config:      (defaults)"))
        .stdout(predicate::str::contains("credential:  process-id"));
}

#[test]
fn check_missing_endpoint_fails() {
    let temp = TempDir::new().unwrap();

    chansync(&temp)
        .args(["check", "--network", "devnet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: endpoint is not configured"));
}

#[test]
fn check_invalid_endpoint_fails() {
    let temp = TempDir::new().unwrap();

    chansync(&temp)
        .args([
            "check",
            "--endpoint",
            "https://example.net",
            "--network",
            "devnet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid endpoint"));
}

#[test]
fn check_missing_config_file_fails() {
    let temp = TempDir::new().unwrap();

    chansync(&temp)
        .arg("check")
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn check_malformed_config_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, "[connection\nendpoint = ");

    chansync(&temp)
        .arg("check")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("toml error"));
}
