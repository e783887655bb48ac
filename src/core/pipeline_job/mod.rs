//! Managed-pipeline job documents submitted to the PipelineJobs API.
//!
//! Every struct keeps unknown keys in `extra` so a document read from disk
//! survives a parse/serialize cycle with nothing but the modelled fields
//! touched.

mod artifact;

pub use artifact::{ArtifactKind, ArtifactSpec, PropertyValue};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Name carried by a compiled document until it is submitted.
pub const UNNAMED_JOB: &str = "<insert fully qualified unique job name here>";

/// Default display name when the component has none.
pub const DEFAULT_DISPLAY_NAME: &str = "PipelineJob";

/// Root of a job-specification document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJob {
    pub name: String,
    pub display_name: String,
    pub spec: PipelineSpec,
    pub output_path_config: OutputPathConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub steps: IndexMap<String, Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_context: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub task: StepTask,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepTask {
    pub container: ContainerSpec,
    #[serde(default)]
    pub inputs: IndexMap<String, StepInput>,
    #[serde(default)]
    pub outputs: IndexMap<String, StepOutput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input bound to the output of another step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StepInput {
    pub step_output: StepOutputReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct StepOutputReference {
    pub step: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub artifact: ArtifactSpec,
    pub output_uri_config: OutputUriConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUriConfig {
    pub file_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPathConfig {
    pub pipeline_root: String,
}

/// Errors raised while reading or writing job documents.
#[derive(Debug, thiserror::Error)]
pub enum JobDocumentError {
    #[error("failed to read job document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid job document {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineJob {
    /// Container images in step order, duplicates included.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.spec
            .steps
            .values()
            .map(|step| step.task.container.image.as_str())
    }

    pub fn load(path: &Path) -> Result<Self, JobDocumentError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| JobDocumentError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| JobDocumentError::Parse {
            path: display,
            source,
        })
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
