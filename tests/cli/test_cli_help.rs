use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_top_level_help_lists_pipeline_commands() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PIPELINE COMMANDS"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("mirror"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("cancel"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_compile_help_shows_example() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.arg("compile").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--pipeline-root"))
        .stdout(predicate::str::contains("--arg <NAME=VALUE>"))
        .stdout(predicate::str::contains("kfp-gcp compile pipeline.yaml"));
}

#[test]
fn test_run_help_mentions_mirroring_switch() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.arg("run").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--no-mirror"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn test_wait_help_describes_exit_status() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.arg("wait").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("exits non-zero unless it succeeds"));
}

#[test]
fn test_missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("subcommand"));
}

#[test]
fn test_malformed_argument_is_rejected() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.args(["compile", "pipeline.yaml", "--arg", "novalue"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.args(["wait", "job-1", "--interval", "0s"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}
