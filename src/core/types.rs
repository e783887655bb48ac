use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    ConfigError,
    TranslationError,
    MirrorError,
    ApiError,
    TimeoutError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Info,
}

/// Tool that copies artifacts between cloud storage and the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StagingTool {
    /// Download the small `gcs_copy` helper binary at container start.
    #[default]
    GcsCopy,
    /// Use the Cloud SDK `gsutil cp` command shipped in the image.
    Gsutil,
}

impl std::fmt::Display for StagingTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StagingTool::GcsCopy => write!(f, "gcs_copy"),
            StagingTool::Gsutil => write!(f, "gsutil"),
        }
    }
}

impl std::str::FromStr for StagingTool {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gcs_copy" | "gcs-copy" => Ok(StagingTool::GcsCopy),
            "gsutil" => Ok(StagingTool::Gsutil),
            _ => Err(format!(
                "invalid staging tool '{}'; supported values are gcs_copy, gsutil",
                value
            )),
        }
    }
}
