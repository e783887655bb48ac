use super::ApiError;
use crate::core::gcloud::Gcloud;
use async_trait::async_trait;

/// Source of bearer tokens; asked once per request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// Tokens from `gcloud auth print-access-token`.
#[derive(Clone, Default)]
pub struct GcloudTokenProvider {
    gcloud: Gcloud,
}

impl GcloudTokenProvider {
    pub fn new(gcloud: Gcloud) -> Self {
        Self { gcloud }
    }
}

#[async_trait]
impl TokenProvider for GcloudTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        self.gcloud
            .print_access_token()
            .await
            .map_err(ApiError::Token)
    }
}

/// A fixed token, typically from configuration.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}
