//! CLI argument-parsing smoke tests, per `SPEC_FULL.md` §8's
//! "Ambient-stack tests": `tachyon-master --help` and recovery against a
//! scrubbed/bad environment falling back to defaults without panicking.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn tachyon_master() -> Command {
    Command::cargo_bin("tachyon-master").unwrap()
}

#[test]
fn help_flag_prints_usage_and_exits_successfully() {
    tachyon_master()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tachyon-master"));
}

#[test]
fn version_flag_prints_a_version_and_exits_successfully() {
    tachyon_master().arg("--version").assert().success();
}

#[test]
fn bad_environment_falls_back_to_defaults_without_panicking() {
    let dir = tempdir().unwrap();
    tachyon_master()
        .env("WORKER_TIMEOUT_MS", "not-a-number")
        .env("MAX_COLUMNS", "also-not-a-number")
        .arg("--tachyon-home")
        .arg(dir.path())
        .arg("--recover-only")
        .assert()
        .success();
}

#[test]
fn recover_only_exits_without_starting_background_threads() {
    let dir = tempdir().unwrap();
    tachyon_master()
        .arg("-v")
        .arg("--tachyon-home")
        .arg(dir.path())
        .arg("--recover-only")
        .assert()
        .success()
        .stderr(predicate::str::contains("recovery complete"));
}
