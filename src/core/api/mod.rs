//! Client for the managed PipelineJobs REST API.

mod auth;
mod client;
mod job;
mod naming;

pub use auth::{GcloudTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{PipelineJobApi, DEFAULT_API_HOST};
pub use job::{JobState, PipelineJobHandle, DEFAULT_POLL_INTERVAL};
pub use naming::{generate_job_name, job_name_from_timestamp};

use crate::core::gcloud::GcloudError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to obtain an access token: {0}")]
    Token(#[source] GcloudError),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("job {job} did not finish within {}", format_timeout(.timeout))]
    Timeout { job: String, timeout: Duration },
}

impl ApiError {
    /// Worth retrying on the next poll: network trouble, server-side
    /// failures, throttling and token refresh hiccups.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Token(_) | ApiError::Http { .. } => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Timeout { .. } => false,
        }
    }
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}
