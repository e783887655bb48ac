//! Thin wrapper over the `gcloud` CLI.
//!
//! Subprocesses go through [`CommandRunner`] so tests can substitute a fake.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

const GCLOUD: &str = "gcloud";

#[derive(Debug, thiserror::Error)]
pub enum GcloudError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with code {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("`{command}` printed an empty access token")]
    EmptyToken { command: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, GcloudError>;
}

/// Runs commands as child processes with captured output.
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, GcloudError> {
        let output = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GcloudError::Spawn {
                program: request.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[derive(Clone)]
pub struct Gcloud {
    runner: Arc<dyn CommandRunner>,
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new(Arc::new(TokioCommandRunner))
    }
}

impl Gcloud {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `gcloud auth print-access-token`, trimmed.
    pub async fn print_access_token(&self) -> Result<String, GcloudError> {
        let request = CommandRequest::new(GCLOUD, ["auth", "print-access-token"]);
        let output = self.checked(&request).await?;
        let token = output.stdout_text().trim().to_string();
        if token.is_empty() {
            return Err(GcloudError::EmptyToken {
                command: request.display(),
            });
        }
        Ok(token)
    }

    /// Metadata of a registry image, or `None` when it cannot be described.
    pub async fn describe_image(&self, image: &str, project_id: Option<&str>) -> Option<Value> {
        let mut args = vec!["container", "images", "describe", image, "--format", "json"];
        if let Some(project_id) = project_id {
            args.extend(["--project", project_id]);
        }
        let request = CommandRequest::new(GCLOUD, args);

        let output = match self.runner.run(&request).await {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(image, error = %err, "image describe could not run");
                return None;
            }
        };
        if !output.success() {
            tracing::debug!(image, exit_code = output.exit_code, "image not found");
            return None;
        }
        match serde_json::from_slice(&output.stdout) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(image, error = %err, "image description is not JSON");
                None
            }
        }
    }

    /// `gcloud builds submit` with a config file and no source upload.
    pub async fn submit_build(
        &self,
        config_path: &Path,
        project_id: Option<&str>,
    ) -> Result<CommandOutput, GcloudError> {
        let config = config_path.display().to_string();
        let mut args = vec![
            "builds",
            "submit",
            "--config",
            config.as_str(),
            "--no-source",
            "--quiet",
        ];
        if let Some(project_id) = project_id {
            args.extend(["--project", project_id]);
        }
        self.checked(&CommandRequest::new(GCLOUD, args)).await
    }

    async fn checked(&self, request: &CommandRequest) -> Result<CommandOutput, GcloudError> {
        tracing::debug!(command = %request.display(), "running gcloud");
        let output = self.runner.run(request).await?;
        if !output.success() {
            return Err(GcloudError::Failed {
                command: request.display(),
                exit_code: output.exit_code,
                stderr: output.stderr_text(),
            });
        }
        Ok(output)
    }
}
