//! Container image mirroring.
//!
//! Images outside the trusted registries are copied to `<prefix><image>` by a
//! single remote build, then the job document is rewritten to use the copies.

mod cloudbuild;

pub use cloudbuild::{BuildConfig, BuildStep};

use crate::core::gcloud::{Gcloud, GcloudError};
use crate::core::pipeline_job::PipelineJob;
use indexmap::{IndexMap, IndexSet};
use std::io::Write;

pub const DEFAULT_TRUSTED_REGISTRY: &str = "gcr.io/";

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Image mirroring failed: STDERR={stderr}")]
    BuildFailed { stderr: String },
    #[error(transparent)]
    Gcloud(#[from] GcloudError),
    #[error("failed to write build config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize build config: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn default_mirror_prefix(project_id: &str) -> String {
    format!("gcr.io/{}/mirror/", project_id)
}

/// Distinct images in step order.
pub fn used_images(job: &PipelineJob) -> IndexSet<String> {
    job.images().map(str::to_string).collect()
}

/// Map every untrusted image to its mirror name.
pub fn plan_replacements<'a>(
    images: impl IntoIterator<Item = &'a String>,
    mirror_prefix: &str,
    trusted_registries: &[String],
) -> IndexMap<String, String> {
    images
        .into_iter()
        .filter(|image| {
            !trusted_registries
                .iter()
                .any(|registry| image.starts_with(registry.as_str()))
        })
        .map(|image| (image.clone(), format!("{}{}", mirror_prefix, image)))
        .collect()
}

/// Copy of `job` with image references swapped; nothing else changes.
pub fn replace_images(job: &PipelineJob, replacements: &IndexMap<String, String>) -> PipelineJob {
    let mut patched = job.clone();
    for step in patched.spec.steps.values_mut() {
        let container = &mut step.task.container;
        if let Some(replacement) = replacements.get(&container.image) {
            container.image = replacement.clone();
        }
    }
    patched
}

pub struct ImageMirror {
    gcloud: Gcloud,
    project_id: Option<String>,
    trusted_registries: Vec<String>,
}

impl ImageMirror {
    pub fn new(gcloud: Gcloud) -> Self {
        Self {
            gcloud,
            project_id: None,
            trusted_registries: vec![DEFAULT_TRUSTED_REGISTRY.to_string()],
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_trusted_registries(mut self, trusted_registries: Vec<String>) -> Self {
        self.trusted_registries = trusted_registries;
        self
    }

    pub async fn mirror_and_replace_container_images(
        &self,
        job: &PipelineJob,
        mirror_prefix: &str,
    ) -> Result<PipelineJob, MirrorError> {
        let images = used_images(job);
        let replacements = plan_replacements(&images, mirror_prefix, &self.trusted_registries);

        tracing::debug!(
            candidates = replacements.len(),
            "checking for existing image mirrors"
        );
        let mut missing = IndexMap::new();
        for (image, mirror) in &replacements {
            if self
                .gcloud
                .describe_image(mirror, self.project_id.as_deref())
                .await
                .is_none()
            {
                missing.insert(image.clone(), mirror.clone());
            }
        }

        if !missing.is_empty() {
            self.mirror_images(&missing).await?;
        }

        Ok(replace_images(job, &replacements))
    }

    async fn mirror_images(&self, mirrors: &IndexMap<String, String>) -> Result<(), MirrorError> {
        tracing::info!(images = ?mirrors, "mirroring container images");
        let config = BuildConfig::for_mirrors(mirrors);

        let mut config_file = tempfile::Builder::new()
            .prefix("cloudbuild-")
            .suffix(".json")
            .tempfile()?;
        config_file.write_all(serde_json::to_string_pretty(&config)?.as_bytes())?;
        config_file.flush()?;

        match self
            .gcloud
            .submit_build(config_file.path(), self.project_id.as_deref())
            .await
        {
            Ok(_) => {
                tracing::info!(count = mirrors.len(), "container images mirrored");
                Ok(())
            }
            Err(GcloudError::Failed { stderr, .. }) => Err(MirrorError::BuildFailed { stderr }),
            Err(err) => Err(err.into()),
        }
    }
}
