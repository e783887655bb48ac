//! Compile, mirror and submit in one call.

use crate::core::api::{ApiError, PipelineJobApi, PipelineJobHandle};
use crate::core::component::ComponentSpec;
use crate::core::mirror::{ImageMirror, MirrorError};
use crate::core::translator::{compile_pipeline, CompileOptions, TranslateError};
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to compile pipeline: {0}")]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error("failed to submit pipeline job: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub compile: CompileOptions,
    /// Generated from the current time when absent.
    pub job_name: Option<String>,
    /// Mirror untrusted images under this prefix; `None` submits them as-is.
    pub mirror_prefix: Option<String>,
}

pub async fn run_pipeline(
    component: &ComponentSpec,
    arguments: &IndexMap<String, Value>,
    options: &RunOptions,
    mirror: &ImageMirror,
    api: &PipelineJobApi,
) -> Result<PipelineJobHandle, RunError> {
    let mut job = compile_pipeline(component, arguments, &options.compile)?;

    if let Some(prefix) = options.mirror_prefix.as_deref() {
        job = mirror
            .mirror_and_replace_container_images(&job, prefix)
            .await?;
    }

    let handle = api
        .submit_job(&job, options.job_name.as_deref().unwrap_or_default())
        .await?;
    tracing::info!(
        job = %handle.job_name(),
        url = %api.console_url(handle.job_name()),
        "pipeline job submitted"
    );
    Ok(handle)
}
