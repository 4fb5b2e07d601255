//! Integration tests for the fob binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn fob() -> Command {
    let mut cmd = Command::cargo_bin("fob").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

fn locale_data() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("en.mjs"), "export default {};").unwrap();
    temp
}

#[test]
fn test_help_lists_commands() {
    fob()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("locale"));
}

#[test]
fn test_locale_reports_fallback_and_missing() {
    let data = locale_data();

    fob()
        .args(["locale", "--data-dir"])
        .arg(data.path())
        .args(["en-GB", "fr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("en-GB\tfallback\ten\t"))
        .stdout(predicate::str::contains("fr\tmissing"));
}

#[test]
fn test_locale_strict_fails_on_missing() {
    let data = locale_data();

    fob()
        .args(["locale", "--strict", "--data-dir"])
        .arg(data.path())
        .args(["en", "fr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fr"));
}

#[test]
fn test_serve_rejects_missing_output_dir() {
    let temp = TempDir::new().unwrap();

    fob()
        .current_dir(temp.path())
        .args(["serve", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("output_dir"));
}

#[test]
fn test_serve_rejects_malformed_header_flag() {
    let temp = TempDir::new().unwrap();

    fob()
        .current_dir(temp.path())
        .args(["serve", "--header", "no-equals-sign"])
        .assert()
        .failure();
}
