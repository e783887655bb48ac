use async_trait::async_trait;
use kfp_gcp::core::gcloud::{CommandOutput, CommandRequest, CommandRunner, Gcloud, GcloudError};
use kfp_gcp::core::mirror::{BuildConfig, ImageMirror, MirrorError};
use kfp_gcp::core::pipeline_job::PipelineJob;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Pretends to be gcloud: images in `existing` describe successfully, and
/// every submitted build config is captured.
#[derive(Default)]
struct FakeGcloud {
    existing: HashSet<String>,
    fail_builds: bool,
    requests: Mutex<Vec<CommandRequest>>,
    builds: Mutex<Vec<BuildConfig>>,
}

impl FakeGcloud {
    fn with_existing(images: &[&str]) -> Self {
        Self {
            existing: images.iter().map(|image| image.to_string()).collect(),
            ..Self::default()
        }
    }

    fn describes(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.args.starts_with(&["container".to_string()]))
            .map(|request| request.args[3].clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeGcloud {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, GcloudError> {
        self.requests.lock().unwrap().push(request.clone());
        match request.args.first().map(String::as_str) {
            Some("container") => {
                let image = &request.args[3];
                if self.existing.contains(image) {
                    Ok(CommandOutput {
                        stdout: br#"{"image_summary": {}}"#.to_vec(),
                        ..CommandOutput::default()
                    })
                } else {
                    Ok(CommandOutput {
                        stderr: b"ERROR: not found".to_vec(),
                        exit_code: 1,
                        ..CommandOutput::default()
                    })
                }
            }
            Some("builds") => {
                let config_index = request
                    .args
                    .iter()
                    .position(|arg| arg == "--config")
                    .expect("--config flag");
                let content = std::fs::read_to_string(&request.args[config_index + 1]).unwrap();
                self.builds
                    .lock()
                    .unwrap()
                    .push(serde_json::from_str(&content).unwrap());
                if self.fail_builds {
                    Ok(CommandOutput {
                        stderr: b"step 0 failed".to_vec(),
                        exit_code: 1,
                        ..CommandOutput::default()
                    })
                } else {
                    Ok(CommandOutput::default())
                }
            }
            other => panic!("unexpected gcloud call: {:?}", other),
        }
    }
}

fn job(images: &[&str]) -> PipelineJob {
    let steps: serde_json::Map<String, serde_json::Value> = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            (
                format!("step-{}", index),
                json!({"task": {"container": {"image": image, "command": ["run"]}}}),
            )
        })
        .collect();
    serde_json::from_value(json!({
        "name": "n",
        "displayName": "mirror test",
        "spec": {"steps": steps, "pipelineContext": "Default"},
        "outputPathConfig": {"pipelineRoot": "gs://bucket"}
    }))
    .unwrap()
}

fn mirror(fake: &Arc<FakeGcloud>) -> ImageMirror {
    ImageMirror::new(Gcloud::new(fake.clone())).with_project("my-project")
}

#[tokio::test]
async fn test_untrusted_images_are_mirrored_in_one_build() {
    let fake = Arc::new(FakeGcloud::default());
    let original = job(&["docker.io/library/python:3.8", "quay.io/org/tool", "gcr.io/p/ok"]);

    let mirrored = mirror(&fake)
        .mirror_and_replace_container_images(&original, "gcr.io/my-project/mirror/")
        .await
        .unwrap();

    assert_eq!(
        mirrored.images().collect::<Vec<_>>(),
        vec![
            "gcr.io/my-project/mirror/docker.io/library/python:3.8",
            "gcr.io/my-project/mirror/quay.io/org/tool",
            "gcr.io/p/ok",
        ]
    );

    let builds = fake.builds.lock().unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(
        builds[0].images,
        vec![
            "gcr.io/my-project/mirror/docker.io/library/python:3.8",
            "gcr.io/my-project/mirror/quay.io/org/tool",
        ]
    );
    assert_eq!(builds[0].steps.len(), 2);
}

#[tokio::test]
async fn test_existing_mirrors_are_reused() {
    let fake = Arc::new(FakeGcloud::with_existing(&["m/docker.io/a"]));
    let original = job(&["docker.io/a", "docker.io/a"]);

    let mirrored = mirror(&fake)
        .mirror_and_replace_container_images(&original, "m/")
        .await
        .unwrap();

    assert_eq!(
        mirrored.images().collect::<Vec<_>>(),
        vec!["m/docker.io/a", "m/docker.io/a"]
    );
    assert!(fake.builds.lock().unwrap().is_empty());
    assert_eq!(fake.describes(), vec!["m/docker.io/a"]);
}

#[tokio::test]
async fn test_describe_is_scoped_to_project() {
    let fake = Arc::new(FakeGcloud::with_existing(&["m/docker.io/a"]));
    mirror(&fake)
        .mirror_and_replace_container_images(&job(&["docker.io/a"]), "m/")
        .await
        .unwrap();

    let requests = fake.requests.lock().unwrap();
    let args = &requests[0].args;
    assert_eq!(&args[..3], &["container", "images", "describe"]);
    assert!(args.ends_with(&["--project".to_string(), "my-project".to_string()]));
}

#[tokio::test]
async fn test_trusted_only_job_is_untouched() {
    let fake = Arc::new(FakeGcloud::default());
    let original = job(&["gcr.io/a/b", "gcr.io/c/d"]);

    let mirrored = mirror(&fake)
        .mirror_and_replace_container_images(&original, "gcr.io/my-project/mirror/")
        .await
        .unwrap();

    assert_eq!(mirrored, original);
    assert!(fake.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_trusted_registries() {
    let fake = Arc::new(FakeGcloud::default());
    let original = job(&["us-docker.pkg.dev/x/y", "gcr.io/p/ok"]);

    let mirrored = ImageMirror::new(Gcloud::new(fake.clone()))
        .with_trusted_registries(vec!["us-docker.pkg.dev/".to_string()])
        .mirror_and_replace_container_images(&original, "m/")
        .await
        .unwrap();

    assert_eq!(
        mirrored.images().collect::<Vec<_>>(),
        vec!["us-docker.pkg.dev/x/y", "m/gcr.io/p/ok"]
    );
}

#[tokio::test]
async fn test_failed_build_reports_stderr() {
    let fake = Arc::new(FakeGcloud {
        fail_builds: true,
        ..FakeGcloud::default()
    });

    let err = mirror(&fake)
        .mirror_and_replace_container_images(&job(&["docker.io/a"]), "m/")
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::BuildFailed { .. }));
    assert_eq!(err.to_string(), "Image mirroring failed: STDERR=step 0 failed");
}
