use indexmap::IndexMap;
use kfp_gcp::core::component::{load_component, parse_component};
use kfp_gcp::core::pipeline_job::{ArtifactKind, PipelineJob, UNNAMED_JOB};
use kfp_gcp::core::translator::{compile_pipeline, CompileOptions, TranslateError};
use kfp_gcp::core::StagingTool;
use serde_json::{json, Value};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn arguments(pairs: &[(&str, &str)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect()
}

fn compile_word_count(pairs: &[(&str, &str)]) -> PipelineJob {
    let component = load_component(&fixture("two_step_pipeline.yaml")).unwrap();
    compile_pipeline(
        &component,
        &arguments(pairs),
        &CompileOptions::new("gs://bucket/runs"),
    )
    .unwrap()
}

#[test]
fn test_compiled_document_wire_shape() {
    let job = compile_word_count(&[("mode", "words")]);
    let document = serde_json::to_value(&job).unwrap();

    assert_eq!(document["name"], json!(UNNAMED_JOB));
    assert_eq!(document["displayName"], json!("Word count"));
    assert_eq!(document["spec"]["pipelineContext"], json!("Default"));
    assert_eq!(
        document["outputPathConfig"],
        json!({"pipelineRoot": "gs://bucket/runs"})
    );

    let steps = document["spec"]["steps"].as_object().unwrap();
    assert_eq!(
        steps.keys().collect::<Vec<_>>(),
        vec!["write-text", "count-words"]
    );

    let count = &steps["count-words"]["task"];
    assert_eq!(
        count["inputs"]["text_file"],
        json!({"step_output": {"step": "write-text", "output": "text_file"}})
    );
    assert_eq!(
        count["outputs"]["metrics"],
        json!({
            "artifact": {
                "metrics": {},
                "custom_properties": {
                    "custom:name": {"string_value": "metrics"},
                    "type_name": {"string_value": "Metrics"}
                }
            },
            "outputUriConfig": {"filePath": true}
        })
    );
    assert_eq!(
        count["container"]["image"],
        json!("gcr.io/ml-pipeline/counter:1.0")
    );
}

#[test]
fn test_graph_inputs_fall_back_to_defaults() {
    let job = compile_word_count(&[("mode", "words")]);
    let command = &job.spec.steps["write-text"].task.container.command;
    assert!(command.contains(&"hello world".to_string()));

    let job = compile_word_count(&[("mode", "words"), ("greeting", "good morning")]);
    let command = &job.spec.steps["write-text"].task.container.command;
    assert!(command.contains(&"good morning".to_string()));
    assert!(!command.contains(&"hello world".to_string()));
}

#[test]
fn test_missing_required_graph_argument() {
    let component = load_component(&fixture("two_step_pipeline.yaml")).unwrap();
    let err = compile_pipeline(
        &component,
        &IndexMap::new(),
        &CompileOptions::new("gs://bucket/runs"),
    )
    .unwrap_err();

    match err {
        TranslateError::MissingGraphArgument {
            task, graph_input, ..
        } => {
            assert_eq!(task, "count-words");
            assert_eq!(graph_input, "mode");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_user_command_follows_staging_script() {
    let job = compile_word_count(&[("mode", "lines")]);
    let command = &job.spec.steps["count-words"].task.container.command;

    assert_eq!(&command[..3], &["sh", "-ex", "-c"]);
    assert_eq!(
        &command[4..],
        &[
            "count",
            "--mode",
            "lines",
            "/tmp/inputs/text_file/data",
            "/tmp/outputs/count/data",
            "/tmp/outputs/metrics/data",
        ]
    );

    let script = &command[3];
    assert!(script.contains("mkdir -p '/tmp/inputs/text_file'"));
    assert!(script.contains(
        "gcs_copy '{{$.inputs['text_file'].uri}}' '/tmp/inputs/text_file/data'"
    ));
    assert!(script.contains(
        "gcs_copy '/tmp/outputs/metrics/data' '{{$.outputs['metrics'].uri}}'"
    ));
}

#[test]
fn test_output_kinds_follow_type_names() {
    let job = compile_word_count(&[("mode", "words")]);
    let outputs = &job.spec.steps["count-words"].task.outputs;
    assert_eq!(outputs["count"].artifact.kind, ArtifactKind::File);
    assert_eq!(outputs["metrics"].artifact.kind, ArtifactKind::Metrics);
}

#[test]
fn test_options_are_carried_into_document() {
    let component = load_component(&fixture("two_step_pipeline.yaml")).unwrap();
    let options = CompileOptions {
        pipeline_root: "gs://other/root".to_string(),
        pipeline_context: "nightly".to_string(),
        staging_tool: StagingTool::Gsutil,
    };
    let job = compile_pipeline(&component, &arguments(&[("mode", "words")]), &options).unwrap();

    assert_eq!(job.spec.pipeline_context.as_deref(), Some("nightly"));
    assert_eq!(job.output_path_config.pipeline_root, "gs://other/root");
    let script = &job.spec.steps["write-text"].task.container.command[3];
    assert!(script.contains("gsutil cp '/tmp/outputs/text_file/data'"));
    assert!(!script.contains("gcs_copy"));
}

#[test]
fn test_compiled_document_loads_back() {
    let job = compile_word_count(&[("mode", "words")]);
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("job.json");
    std::fs::write(&path, job.to_pretty_json().unwrap()).unwrap();

    assert_eq!(PipelineJob::load(&path).unwrap(), job);
}

#[test]
fn test_dependency_cycle_is_rejected() {
    let component = parse_component(
        r#"
implementation:
  graph:
    tasks:
      a:
        componentRef:
          spec:
            inputs: [{name: x}]
            outputs: [{name: y}]
            implementation: {container: {image: alpine, command: [cat, {inputPath: x}, {outputPath: y}]}}
        arguments:
          x: {taskOutput: {taskId: b, outputName: y}}
      b:
        componentRef:
          spec:
            inputs: [{name: x}]
            outputs: [{name: y}]
            implementation: {container: {image: alpine, command: [cat, {inputPath: x}, {outputPath: y}]}}
        arguments:
          x: {taskOutput: {taskId: a, outputName: y}}
"#,
    )
    .unwrap();

    let err = compile_pipeline(&component, &IndexMap::new(), &CompileOptions::new("gs://b"))
        .unwrap_err();
    assert!(matches!(err, TranslateError::Cycle { .. }), "{}", err);
}

#[test]
fn test_unknown_task_reference_is_rejected() {
    let component = parse_component(
        r#"
implementation:
  graph:
    tasks:
      only:
        componentRef:
          spec:
            inputs: [{name: x}]
            implementation: {container: {image: alpine, command: [cat, {inputPath: x}]}}
        arguments:
          x: {taskOutput: {taskId: ghost, outputName: y}}
"#,
    )
    .unwrap();

    let err = compile_pipeline(&component, &IndexMap::new(), &CompileOptions::new("gs://b"))
        .unwrap_err();
    assert!(
        matches!(err, TranslateError::UnknownTaskReference { ref referenced, .. } if referenced == "ghost"),
        "{}",
        err
    );
}

#[test]
fn test_tasks_without_artifacts_keep_plain_command() {
    let component = parse_component(
        r#"
implementation:
  graph:
    tasks:
      hello:
        componentRef:
          spec:
            inputs: [{name: who}]
            implementation: {container: {image: alpine, command: [echo, {inputValue: who}]}}
        arguments:
          who: world
"#,
    )
    .unwrap();

    let job = compile_pipeline(&component, &IndexMap::new(), &CompileOptions::new("gs://b"))
        .unwrap();
    assert_eq!(
        job.spec.steps["hello"].task.container.command,
        vec!["echo", "world"]
    );
    assert_eq!(job.display_name, "PipelineJob");
}
