use async_trait::async_trait;
use indexmap::IndexMap;
use kfp_gcp::core::api::{PipelineJobApi, StaticTokenProvider};
use kfp_gcp::core::component::load_component;
use kfp_gcp::core::gcloud::{CommandOutput, CommandRequest, CommandRunner, Gcloud, GcloudError};
use kfp_gcp::core::mirror::ImageMirror;
use kfp_gcp::core::runner::{run_pipeline, RunError, RunOptions};
use kfp_gcp::core::translator::CompileOptions;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOBS_PATH: &str = "/v1/projects/run-project/pipelineJobs";

/// Every image is missing from the registry and every build succeeds.
#[derive(Default)]
struct EmptyRegistry {
    calls: Mutex<Vec<CommandRequest>>,
}

#[async_trait]
impl CommandRunner for EmptyRegistry {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, GcloudError> {
        self.calls.lock().unwrap().push(request.clone());
        let exit_code = if request.args[0] == "container" { 1 } else { 0 };
        Ok(CommandOutput {
            exit_code,
            ..CommandOutput::default()
        })
    }
}

fn component_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/two_step_pipeline.yaml")
}

fn arguments() -> IndexMap<String, Value> {
    IndexMap::from([("mode".to_string(), json!("words"))])
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    server
}

fn api(server: &MockServer) -> PipelineJobApi {
    PipelineJobApi::with_base_url(
        "run-project",
        &server.uri(),
        Arc::new(StaticTokenProvider::new("t")),
    )
}

async fn submitted_document(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

#[tokio::test]
async fn test_run_mirrors_then_submits() {
    let server = accepting_server().await;
    let registry = Arc::new(EmptyRegistry::default());
    let mirror = ImageMirror::new(Gcloud::new(registry.clone())).with_project("run-project");
    let options = RunOptions {
        compile: CompileOptions::new("gs://bucket/runs"),
        job_name: Some("word-count-1".to_string()),
        mirror_prefix: Some("gcr.io/run-project/mirror/".to_string()),
    };

    let component = load_component(&component_path()).unwrap();
    let handle = run_pipeline(&component, &arguments(), &options, &mirror, &api(&server))
        .await
        .unwrap();
    assert_eq!(handle.job_name(), "word-count-1");

    let document = submitted_document(&server).await;
    assert_eq!(
        document["name"],
        json!("projects/run-project/pipelineJobs/word-count-1")
    );
    assert_eq!(
        document["spec"]["steps"]["write-text"]["task"]["container"]["image"],
        json!("gcr.io/run-project/mirror/docker.io/library/python:3.8")
    );
    assert_eq!(
        document["spec"]["steps"]["count-words"]["task"]["container"]["image"],
        json!("gcr.io/ml-pipeline/counter:1.0")
    );

    let calls = registry.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(&calls[1].args[..2], &["builds", "submit"]);
}

#[tokio::test]
async fn test_run_without_mirroring_keeps_images() {
    let server = accepting_server().await;
    let registry = Arc::new(EmptyRegistry::default());
    let mirror = ImageMirror::new(Gcloud::new(registry.clone()));
    let options = RunOptions {
        compile: CompileOptions::new("gs://bucket/runs"),
        job_name: None,
        mirror_prefix: None,
    };

    let component = load_component(&component_path()).unwrap();
    let handle = run_pipeline(&component, &arguments(), &options, &mirror, &api(&server))
        .await
        .unwrap();
    assert!(handle.job_name().starts_with("job-"));

    let document = submitted_document(&server).await;
    assert_eq!(
        document["spec"]["steps"]["write-text"]["task"]["container"]["image"],
        json!("docker.io/library/python:3.8")
    );
    assert!(registry.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_compile_errors_stop_before_submission() {
    let server = accepting_server().await;
    let mirror = ImageMirror::new(Gcloud::new(Arc::new(EmptyRegistry::default())));
    let options = RunOptions {
        compile: CompileOptions::new("gs://bucket/runs"),
        job_name: None,
        mirror_prefix: None,
    };

    let component = load_component(&component_path()).unwrap();
    let err = run_pipeline(&component, &IndexMap::new(), &options, &mirror, &api(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Translate(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_submission_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad spec"))
        .mount(&server)
        .await;
    let mirror = ImageMirror::new(Gcloud::new(Arc::new(EmptyRegistry::default())));
    let options = RunOptions {
        compile: CompileOptions::new("gs://bucket/runs"),
        job_name: Some("x".to_string()),
        mirror_prefix: None,
    };

    let component = load_component(&component_path()).unwrap();
    let err = run_pipeline(&component, &arguments(), &options, &mirror, &api(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Api(_)));
    assert!(err.to_string().contains("bad spec"));
}
