//! CLI surface tests for the `cronlock` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn cronlock() -> Command {
    Command::cargo_bin("cronlock").unwrap()
}

#[test]
fn uncontended_run_exits_zero_with_no_output() {
    cronlock()
        .args(["mem://local", "/jobs/test", "--hold", "0"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn blocked_run_prints_the_locked_line_and_exits_zero() {
    cronlock()
        .args(["mem://local", "/jobs/test", "--hold", "0", "--contenders", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("LOCKED: /jobs/test/x-"));
}

#[test]
fn more_contenders_still_report_a_single_predecessor() {
    cronlock()
        .args(["mem://local", "/jobs/test", "--hold", "0", "--contenders", "3"])
        .assert()
        .success()
        // The floor predecessor carries the sequence directly below ours.
        .stdout(predicate::str::contains("-0000000003\n"));
}

#[test]
fn unsupported_scheme_fails_nonzero() {
    cronlock()
        .args(["zk://example:2181", "/jobs/test"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn relative_lock_path_fails_nonzero() {
    cronlock()
        .args(["mem://local", "jobs-test", "--hold", "0"])
        .assert()
        .code(1);
}

#[test]
fn missing_arguments_are_a_usage_error() {
    cronlock().assert().code(2);
}
