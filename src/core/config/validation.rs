#![allow(clippy::result_large_err)]

use super::KfpGcpConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &KfpGcpConfig) -> Result<(), AppError> {
        if config.project.id.trim().is_empty() {
            return Err(invalid("CFG-010", "project.id cannot be empty"));
        }

        if config.api.host.trim().is_empty() {
            return Err(invalid("CFG-011", "api.host cannot be empty"));
        }

        if let Some(base_url) = &config.api.base_url {
            let parsed = Url::parse(base_url)
                .map_err(|err| invalid("CFG-012", format!("invalid api.base_url: {}", err)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("CFG-012", "api.base_url must use http or https"));
            }
        }

        if config.api.poll_interval_seconds == 0 {
            return Err(invalid(
                "CFG-013",
                "api.poll_interval_seconds must be greater than zero",
            ));
        }

        if config.pipeline.context.trim().is_empty() {
            return Err(invalid("CFG-014", "pipeline.context cannot be empty"));
        }

        if !config.mirror_prefix().ends_with('/') {
            return Err(invalid("CFG-015", "mirror.prefix must end with '/'")
                .with_suggestion("for example: gcr.io/my-project/mirror/"));
        }

        if config
            .mirror
            .trusted_registries
            .iter()
            .any(|registry| registry.trim().is_empty())
        {
            return Err(invalid(
                "CFG-016",
                "mirror.trusted_registries cannot contain empty entries",
            ));
        }

        Ok(())
    }
}

fn invalid(code: &str, message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code(code)
}
