use indexmap::IndexMap;
use kfp_gcp::core::translator::{
    generate_command_line, input_path, input_uri_placeholder, output_path,
    output_uri_placeholder,
};
use kfp_gcp::core::StagingTool;

fn user_command() -> Vec<String> {
    vec!["python".to_string(), "train.py".to_string()]
}

fn script_lines(command: &[String]) -> Vec<&str> {
    command[3].lines().collect()
}

#[test]
fn test_nothing_to_stage_returns_user_command() {
    let command = generate_command_line(
        &user_command(),
        &IndexMap::new(),
        &IndexMap::new(),
        StagingTool::GcsCopy,
    );
    assert_eq!(command, user_command());
}

#[test]
fn test_user_command_runs_between_downloads_and_uploads() {
    let inputs = IndexMap::from([(input_path("data"), input_uri_placeholder("data"))]);
    let outputs = IndexMap::from([(output_path("model"), output_uri_placeholder("model"))]);
    let command = generate_command_line(&user_command(), &inputs, &outputs, StagingTool::Gsutil);

    assert_eq!(&command[..3], &["sh", "-ex", "-c"]);
    assert_eq!(&command[4..], user_command().as_slice());
    assert_eq!(
        script_lines(&command),
        vec![
            "mkdir -p '/tmp/inputs/data'",
            "mkdir -p '/tmp/outputs/model'",
            "gsutil cp '{{$.inputs['data'].uri}}' '/tmp/inputs/data/data'",
            r#""$0" "$@""#,
            "gsutil cp '/tmp/outputs/model/data' '{{$.outputs['model'].uri}}'",
        ]
    );
}

#[test]
fn test_gcs_copy_fetches_helper_first() {
    let outputs = IndexMap::from([(output_path("out"), output_uri_placeholder("out"))]);
    let command = generate_command_line(
        &user_command(),
        &IndexMap::new(),
        &outputs,
        StagingTool::GcsCopy,
    );

    let lines = script_lines(&command);
    let helper = lines
        .iter()
        .position(|line| line.starts_with("chmod +x"))
        .expect("helper install line");
    let run = lines
        .iter()
        .position(|line| *line == r#""$0" "$@""#)
        .expect("user command line");
    assert!(helper < run);
    assert_eq!(
        lines.last().copied(),
        Some("gcs_copy '/tmp/outputs/out/data' '{{$.outputs['out'].uri}}'")
    );
}

#[test]
fn test_single_quotes_in_paths_are_escaped() {
    let inputs = IndexMap::from([(
        "/tmp/it's/data".to_string(),
        input_uri_placeholder("it's"),
    )]);
    let command = generate_command_line(
        &user_command(),
        &inputs,
        &IndexMap::new(),
        StagingTool::Gsutil,
    );

    let lines = script_lines(&command);
    assert_eq!(lines[0], r"mkdir -p '/tmp/it'\''s'");
    assert_eq!(
        lines[1],
        r"gsutil cp '{{$.inputs['it's'].uri}}' '/tmp/it'\''s/data'"
    );
}

#[test]
fn test_artifact_paths_are_sanitized() {
    assert_eq!(input_path("training data"), "/tmp/inputs/training_data/data");
    assert_eq!(output_path("model.pkl"), "/tmp/outputs/model.pkl/data");
    assert_eq!(output_uri_placeholder("m"), "{{$.outputs['m'].uri}}");
}
