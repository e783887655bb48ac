use crate::core::api::{DEFAULT_API_HOST, DEFAULT_POLL_INTERVAL};
use crate::core::mirror::{default_mirror_prefix, DEFAULT_TRUSTED_REGISTRY};
use crate::core::translator::DEFAULT_PIPELINE_CONTEXT;
use crate::core::types::StagingTool;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

pub const DEFAULT_PROJECT_ID: &str = "managed-pipeline-test";

/// Settings loaded from kfp-gcp.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct KfpGcpConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Cloud project that owns the jobs and the mirror registry
    #[serde(default = "default_project_id")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Full scheme and authority; replaces `https://{host}` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Static bearer token; `gcloud auth print-access-token` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Storage URI under which job outputs are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default = "default_pipeline_context")]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default = "default_trusted_registries")]
    pub trusted_registries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StagingConfig {
    #[serde(default)]
    pub tool: StagingTool,
}

fn default_project_id() -> String {
    DEFAULT_PROJECT_ID.to_string()
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_pipeline_context() -> String {
    DEFAULT_PIPELINE_CONTEXT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_trusted_registries() -> Vec<String> {
    vec![DEFAULT_TRUSTED_REGISTRY.to_string()]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            id: default_project_id(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: default_api_host(),
            base_url: None,
            poll_interval_seconds: default_poll_interval_seconds(),
            access_token: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            root: None,
            context: default_pipeline_context(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            enabled: true,
            prefix: None,
            trusted_registries: default_trusted_registries(),
        }
    }
}

impl KfpGcpConfig {
    /// Configured prefix, or `gcr.io/<project>/mirror/`.
    pub fn mirror_prefix(&self) -> String {
        self.mirror
            .prefix
            .clone()
            .unwrap_or_else(|| default_mirror_prefix(&self.project.id))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.api.poll_interval_seconds)
    }

    /// Scheme and authority of the REST endpoint.
    pub fn api_base_url(&self) -> String {
        self.api
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.api.host))
    }
}
