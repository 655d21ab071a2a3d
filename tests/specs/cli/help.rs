// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `chansync --help` and per-command help.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use yare::parameterized;

fn chansync() -> Command {
    cargo_bin_cmd!("chansync")
}

#[test]
fn help_lists_commands() {
    chansync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn without_arguments_prints_usage_and_fails() {
    chansync()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn version_flag() {
    chansync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chansync"));
}

#[parameterized(
    check = { "check" },
    watch = { "watch" },
)]
fn command_help_shows_connection_overrides(command: &str) {
    chansync()
        .arg(command)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--endpoint"))
        .stdout(predicate::str::contains("--network"))
        .stdout(predicate::str::contains("--credentials"))
        .stdout(predicate::str::contains("--protocol"))
        .stdout(predicate::str::contains("Examples:"));
}

#[test]
fn unknown_command_fails() {
    chansync()
        .arg("sync-everything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn invalid_output_format_fails() {
    chansync()
        .args(["check", "-o", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
