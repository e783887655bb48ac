use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs from an empty directory so no kfp-gcp.toml is picked up.
fn kfp_gcp(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kfp-gcp").unwrap();
    cmd.current_dir(workdir.path())
        .env("HOME", workdir.path())
        .env("KFP_GCP_BATCH", "1")
        .env_remove("KFP_GCP_PIPELINE_ROOT")
        .env_remove("KFP_GCP_PROJECT_ID")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_compile_prints_job_document() {
    let workdir = TempDir::new().unwrap();
    let output = kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--pipeline-root", "gs://bucket/runs", "--arg", "mode=words"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["displayName"], "Word count");
    assert_eq!(document["outputPathConfig"]["pipelineRoot"], "gs://bucket/runs");
    assert!(document["spec"]["steps"]["count-words"].is_object());
}

#[test]
fn test_compile_writes_output_file() {
    let workdir = TempDir::new().unwrap();
    let target = workdir.path().join("job.json");

    kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--pipeline-root", "gs://bucket/runs", "--arg", "mode=words"])
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let document: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(document["spec"]["pipelineContext"], "Default");
}

#[test]
fn test_compile_reads_arguments_file() {
    let workdir = TempDir::new().unwrap();
    let arguments = workdir.path().join("arguments.yaml");
    fs::write(&arguments, "mode: lines\ngreeting: from file\n").unwrap();

    let output = kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--pipeline-root", "gs://b", "--arg", "greeting=from flag"])
        .arg("--arguments-file")
        .arg(&arguments)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    let write_text = document["spec"]["steps"]["write-text"]["task"]["container"]["command"]
        .as_array()
        .unwrap();
    assert!(write_text.iter().any(|item| item == "from flag"));
    let count = document["spec"]["steps"]["count-words"]["task"]["container"]["command"]
        .as_array()
        .unwrap();
    assert!(count.iter().any(|item| item == "lines"));
}

#[test]
fn test_pipeline_root_from_config_file() {
    let workdir = TempDir::new().unwrap();
    fs::write(
        workdir.path().join("kfp-gcp.toml"),
        "[pipeline]\nroot = \"gs://configured/root\"\ncontext = \"nightly\"\n",
    )
    .unwrap();

    let output = kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--arg", "mode=words"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["outputPathConfig"]["pipelineRoot"], "gs://configured/root");
    assert_eq!(document["spec"]["pipelineContext"], "nightly");
}

#[test]
fn test_missing_pipeline_root_fails() {
    let workdir = TempDir::new().unwrap();
    kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--arg", "mode=words"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLI-001"))
        .stderr(predicate::str::contains("--pipeline-root"));
}

#[test]
fn test_container_component_is_rejected() {
    let workdir = TempDir::new().unwrap();
    kfp_gcp(&workdir)
        .arg("compile")
        .arg(fixture("container_component.yaml"))
        .args(["--pipeline-root", "gs://b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLI-005"))
        .stderr(predicate::str::contains("must be a graph component"))
        .stderr(predicate::str::contains("container_component.yaml"));
}

#[test]
fn test_missing_config_file_fails() {
    let workdir = TempDir::new().unwrap();
    kfp_gcp(&workdir)
        .arg("--config")
        .arg(workdir.path().join("absent.toml"))
        .arg("compile")
        .arg(fixture("two_step_pipeline.yaml"))
        .args(["--pipeline-root", "gs://b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CFG-001"));
}
