//! Wrapper script that stages artifacts around the user's command.
//!
//! The script runs as `sh -ex -c <script> <user command...>`, so the user's
//! program and arguments arrive as `$0 "$@"`.

use crate::core::types::StagingTool;
use indexmap::IndexMap;

const GCS_COPY_PREAMBLE: &str = r#"
# Installing wget if it's missing
if ! which wget && ! which curl; then
  if apt-get update -qq -o=Dpkg::Use-Pty=0; then
    apt-get install wget -qq -o=Dpkg::Use-Pty=0
  fi
fi

gcs_copy_url=https://github.com/Ark-kun/gcs_copy_go/releases/download/v0.2/gcs_copy-linux-amd64
bin_dir=/tmp/kfp_bin/
gcs_copy_path="${bin_dir}/gcs_copy"
mkdir -p "$bin_dir"
wget "$gcs_copy_url" --output-document "$gcs_copy_path" --no-verbose || curl "$gcs_copy_url" --location --output "$gcs_copy_path"
chmod +x "$gcs_copy_path"
export PATH=$PATH:"$bin_dir"
"#;

/// Placeholder the backend replaces with the input artifact URI.
pub fn input_uri_placeholder(input_name: &str) -> String {
    format!("{{{{$.inputs['{}'].uri}}}}", input_name)
}

/// Placeholder the backend replaces with the output artifact URI.
pub fn output_uri_placeholder(output_name: &str) -> String {
    format!("{{{{$.outputs['{}'].uri}}}}", output_name)
}

/// Wrap `user_command_line` so inputs are downloaded before and outputs
/// uploaded after it runs. Both maps go from local path to remote URI.
///
/// Returns the user command unchanged when nothing needs staging.
pub fn generate_command_line(
    user_command_line: &[String],
    input_path_uris: &IndexMap<String, String>,
    output_path_uris: &IndexMap<String, String>,
    tool: StagingTool,
) -> Vec<String> {
    if input_path_uris.is_empty() && output_path_uris.is_empty() {
        return user_command_line.to_vec();
    }

    let mut lines: Vec<String> = match tool {
        StagingTool::GcsCopy => GCS_COPY_PREAMBLE.split('\n').map(str::to_string).collect(),
        StagingTool::Gsutil => Vec::new(),
    };

    for path in input_path_uris.keys().chain(output_path_uris.keys()) {
        lines.push(format!("mkdir -p '{}'", shell_escape(&posix_parent(path))));
    }

    // URIs are backend placeholders and must reach the backend verbatim.
    for (path, uri) in input_path_uris {
        lines.push(copy_line(tool, uri, &shell_escape(path)));
    }

    lines.push(r#""$0" "$@""#.to_string());

    for (path, uri) in output_path_uris {
        lines.push(copy_line(tool, &shell_escape(path), uri));
    }

    let script: String = lines.iter().map(|line| format!("{}\n", line)).collect();

    let mut full_command_line = vec![
        "sh".to_string(),
        "-ex".to_string(),
        "-c".to_string(),
        script,
    ];
    full_command_line.extend(user_command_line.iter().cloned());
    full_command_line
}

fn copy_line(tool: StagingTool, from: &str, to: &str) -> String {
    match tool {
        StagingTool::GcsCopy => format!("gcs_copy '{}' '{}'", from, to),
        StagingTool::Gsutil => format!("gsutil cp '{}' '{}'", from, to),
    }
}

/// Escape for use inside a single-quoted shell word.
fn shell_escape(text: &str) -> String {
    text.replace('\'', r"'\''")
}

fn posix_parent(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rsplit_once('/') {
        None => ".".to_string(),
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}
