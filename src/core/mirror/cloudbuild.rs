//! Cloud Build configuration that copies images into a mirror registry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const DOCKER_BUILDER: &str = "gcr.io/cloud-builders/docker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub steps: Vec<BuildStep>,
    /// Images pushed by the build once every step succeeds.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    pub name: String,
    pub wait_for: Vec<String>,
    pub entrypoint: String,
    pub args: Vec<String>,
}

impl BuildConfig {
    /// One parallel pull-and-tag step per `source -> destination` pair.
    pub fn for_mirrors(mirrors: &IndexMap<String, String>) -> Self {
        let mut steps = Vec::with_capacity(mirrors.len());
        let mut images = Vec::with_capacity(mirrors.len());
        for (source, destination) in mirrors {
            steps.push(BuildStep {
                name: DOCKER_BUILDER.to_string(),
                wait_for: vec!["-".to_string()],
                entrypoint: "bash".to_string(),
                args: vec![
                    "-exc".to_string(),
                    format!(
                        "docker pull --quiet {source}\ndocker tag {source} {destination}"
                    ),
                ],
            });
            images.push(destination.clone());
        }
        Self { steps, images }
    }
}
