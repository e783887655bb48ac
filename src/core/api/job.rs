use super::{ApiError, PipelineJobApi};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Lifecycle state reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Cancelling,
    Succeeded,
    Failed,
    Cancelled,
    Other(String),
}

impl JobState {
    /// Accepts bare names and the `PIPELINE_STATE_` / `JOB_STATE_` forms.
    pub fn parse(raw: &str) -> Self {
        let name = raw.trim();
        let name = name
            .strip_prefix("PIPELINE_STATE_")
            .or_else(|| name.strip_prefix("JOB_STATE_"))
            .unwrap_or(name);
        match name {
            "PENDING" | "QUEUED" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "CANCELLING" => JobState::Cancelling,
            "SUCCEEDED" => JobState::Succeeded,
            "FAILED" => JobState::Failed,
            "CANCELLED" => JobState::Cancelled,
            _ => JobState::Other(raw.trim().to_string()),
        }
    }

    /// Still progressing; polling continues.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobState::Pending | JobState::Running | JobState::Cancelling
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, JobState::Succeeded)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Cancelling => write!(f, "CANCELLING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
            JobState::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A submitted job, identified by its short name.
pub struct PipelineJobHandle {
    api: PipelineJobApi,
    job_name: String,
    current_state: Value,
}

impl fmt::Debug for PipelineJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineJobHandle")
            .field("job_name", &self.job_name)
            .finish()
    }
}

impl PipelineJobHandle {
    pub(super) fn new(api: PipelineJobApi, job_name: String) -> Self {
        Self {
            api,
            job_name,
            current_state: Value::Object(Default::default()),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Last document fetched by [`refresh`](Self::refresh).
    pub fn current_state(&self) -> &Value {
        &self.current_state
    }

    pub fn state(&self) -> Option<JobState> {
        self.current_state
            .get("state")
            .and_then(Value::as_str)
            .filter(|state| !state.is_empty())
            .map(JobState::parse)
    }

    /// Step id to execution state from `jobDetail.taskExecutions`.
    pub fn task_execution_states(&self) -> IndexMap<String, String> {
        self.current_state
            .pointer("/jobDetail/taskExecutions")
            .and_then(Value::as_array)
            .map(|executions| {
                executions
                    .iter()
                    .filter_map(|execution| {
                        let step = execution.get("step")?.as_str()?;
                        let state = execution
                            .get("state")
                            .and_then(Value::as_str)
                            .unwrap_or("UNKNOWN");
                        Some((step.to_string(), state.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        self.current_state = self.api.get_job_json(&self.job_name).await?;
        Ok(())
    }

    pub async fn cancel(&self) -> Result<Value, ApiError> {
        self.api.cancel(&self.job_name).await
    }

    /// Poll every `interval` until the job leaves the active states.
    ///
    /// Transient failures are retried on the next round. Returns the final
    /// state, or `None` when the API reported no state at all.
    pub async fn wait_for_completion(
        &mut self,
        timeout: Option<Duration>,
        interval: Duration,
    ) -> Result<Option<JobState>, ApiError> {
        let deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        loop {
            if let Some((at, timeout)) = deadline {
                if Instant::now() >= at {
                    return Err(self.timed_out(timeout));
                }
            }

            let refreshed = match deadline {
                Some((at, timeout)) => tokio::time::timeout_at(at, self.refresh())
                    .await
                    .map_err(|_| self.timed_out(timeout))?,
                None => self.refresh().await,
            };
            if let Err(err) = refreshed {
                if !err.is_transient() {
                    return Err(err);
                }
                tracing::warn!(job = %self.job_name, error = %err, "poll failed, retrying");
                pause(interval, deadline).await;
                continue;
            }

            let Some(state) = self.state() else {
                tracing::warn!(
                    job = %self.job_name,
                    document = %self.current_state,
                    "job document has no state"
                );
                return Ok(None);
            };

            tracing::info!(
                job = %self.job_name,
                state = %state,
                steps = ?self.task_execution_states(),
                "job status"
            );

            if !state.is_active() {
                return Ok(Some(state));
            }
            pause(interval, deadline).await;
        }
    }

    fn timed_out(&self, timeout: Duration) -> ApiError {
        ApiError::Timeout {
            job: self.job_name.clone(),
            timeout,
        }
    }
}

/// Sleep for `interval`, cut short at the deadline.
async fn pause(interval: Duration, deadline: Option<(Instant, Duration)>) {
    let wake = Instant::now() + interval;
    let wake = match deadline {
        Some((at, _)) => wake.min(at),
        None => wake,
    };
    tokio::time::sleep_until(wake).await;
}
