//! Integration tests for the CLI surface: argument parsing and exit
//! behavior, exercised as a subprocess via `assert_cmd` rather than calling
//! into the binary's internals.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_every_subcommand() {
    Command::cargo_bin("rust-udcn-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("fib"))
        .stdout(predicate::str::contains("rib"))
        .stdout(predicate::str::contains("strategy"))
        .stdout(predicate::str::contains("faces"))
        .stdout(predicate::str::contains("cs"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("interest"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    Command::cargo_bin("rust-udcn-cli").unwrap().assert().failure();
}

#[test]
fn fib_add_requires_name_and_face_id() {
    Command::cargo_bin("rust-udcn-cli")
        .unwrap()
        .args(["fib", "add"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn status_rejects_a_malformed_remote_address() {
    // Fails during address parsing, before any network I/O, so this can't
    // hang on an unresponsive socket.
    Command::cargo_bin("rust-udcn-cli")
        .unwrap()
        .args(["--remote", "not-an-address", "status"])
        .assert()
        .failure();
}
