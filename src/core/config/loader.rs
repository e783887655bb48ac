#![allow(clippy::result_large_err)]

use super::KfpGcpConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "kfp-gcp.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path`, or kfp-gcp.toml from the current directory when no path
    /// is given. Environment variables override file values.
    ///
    /// An explicit path must exist; the implicit file is optional.
    pub fn load(path: Option<&Path>) -> Result<KfpGcpConfig, AppError> {
        let config_file = match path {
            Some(path) => Some(Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("Config file {} does not exist", path.display()),
                )
                .with_code("CFG-001")
                .with_suggestion("Pass an existing file to --config or omit the flag")
            })?),
            None => Self::load_from_file(&Self::default_path())?,
        };

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<KfpGcpConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        })?;

        let config: KfpGcpConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-003")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values.
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(config: &mut KfpGcpConfig) {
        if let Ok(project_id) = env::var("KFP_GCP_PROJECT_ID") {
            config.project.id = project_id;
        }

        if let Ok(host) = env::var("KFP_GCP_API_HOST") {
            config.api.host = host;
        }

        if let Ok(base_url) = env::var("KFP_GCP_API_BASE_URL") {
            config.api.base_url = Some(base_url);
        }

        if let Ok(token) = env::var("KFP_GCP_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.api.access_token = Some(token);
            }
        }

        if let Ok(interval) = env::var("KFP_GCP_POLL_INTERVAL_SECONDS") {
            if let Ok(interval) = interval.parse::<u64>() {
                config.api.poll_interval_seconds = interval;
            }
        }

        if let Ok(root) = env::var("KFP_GCP_PIPELINE_ROOT") {
            config.pipeline.root = Some(root);
        }

        if let Ok(enabled) = env::var("KFP_GCP_MIRROR_ENABLED") {
            if let Ok(enabled) = enabled.parse::<bool>() {
                config.mirror.enabled = enabled;
            }
        }

        if let Ok(prefix) = env::var("KFP_GCP_MIRROR_PREFIX") {
            config.mirror.prefix = Some(prefix);
        }
    }
}
