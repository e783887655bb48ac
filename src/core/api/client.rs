use super::job::PipelineJobHandle;
use super::naming::generate_job_name;
use super::{ApiError, TokenProvider};
use crate::core::pipeline_job::PipelineJob;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_API_HOST: &str = "alpha-ml.googleapis.com";

/// Characters left as-is in a job name path segment.
const JOB_NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// REST client bound to one project's `pipelineJobs` collection.
#[derive(Clone)]
pub struct PipelineJobApi {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    project_id: String,
    url_prefix: String,
}

impl PipelineJobApi {
    pub fn new(
        project_id: impl Into<String>,
        api_host: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::with_base_url(project_id, &format!("https://{}", api_host), tokens)
    }

    /// Point the client at an explicit scheme and host, e.g. a local endpoint.
    pub fn with_base_url(
        project_id: impl Into<String>,
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let project_id = project_id.into();
        let url_prefix = format!(
            "{}/v1/projects/{}/pipelineJobs",
            base_url.trim_end_matches('/'),
            project_id
        );
        Self {
            http: reqwest::Client::new(),
            tokens,
            project_id,
            url_prefix,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn job_url(&self, job_name: &str) -> String {
        format!(
            "{}/{}",
            self.url_prefix,
            utf8_percent_encode(job_name, JOB_NAME_ENCODE_SET)
        )
    }

    pub fn full_job_name(&self, job_name: &str) -> String {
        format!("projects/{}/pipelineJobs/{}", self.project_id, job_name)
    }

    /// Cloud console page for a submitted job.
    pub fn console_url(&self, job_name: &str) -> String {
        format!(
            "https://console.cloud.google.com/ai-platform/pipelines/runs/{}?project={}",
            utf8_percent_encode(job_name, JOB_NAME_ENCODE_SET),
            utf8_percent_encode(&self.project_id, JOB_NAME_ENCODE_SET)
        )
    }

    pub fn job(&self, job_name: impl Into<String>) -> PipelineJobHandle {
        PipelineJobHandle::new(self.clone(), job_name.into())
    }

    pub async fn get_job_json(&self, job_name: &str) -> Result<Value, ApiError> {
        self.get_json(&self.job_url(job_name)).await
    }

    /// Request cancellation. The API acknowledges asynchronously; poll the
    /// job to observe the effect.
    pub async fn cancel(&self, job_name: &str) -> Result<Value, ApiError> {
        let url = format!("{}:cancel", self.job_url(job_name));
        self.get_json(&url).await
    }

    /// Every job in the project, as `{"pipelineJobs": [...]}`.
    pub async fn list_jobs(&self) -> Result<Value, ApiError> {
        self.get_json(&self.url_prefix).await
    }

    /// Submit `job` under `job_name`; an empty name is replaced by a
    /// generated one.
    pub async fn submit_job(
        &self,
        job: &PipelineJob,
        job_name: &str,
    ) -> Result<PipelineJobHandle, ApiError> {
        let job_name = if job_name.trim().is_empty() {
            generate_job_name()
        } else {
            job_name.to_string()
        };

        let mut document = job.clone();
        document.name = self.full_job_name(&job_name);

        self.post_json(&self.url_prefix, &document).await?;
        tracing::info!(job = %job_name, project = %self.project_id, "submitted pipeline job");
        Ok(self.job(job_name))
    }

    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| http_error(url, source))?;
        read_json(url, response).await
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value, ApiError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(url, "POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|source| http_error(url, source))?;
        read_json(url, response).await
    }
}

fn http_error(url: &str, source: reqwest::Error) -> ApiError {
    ApiError::Http {
        url: url.to_string(),
        source,
    }
}

async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(url, status = status.as_u16(), body = %body, "pipeline API request failed");
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }
    let text = response
        .text()
        .await
        .map_err(|source| http_error(url, source))?;
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&text).map_err(|err| ApiError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body: format!("invalid JSON response ({}): {}", err, text),
    })
}
