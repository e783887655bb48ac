use crate::core::types::StagingTool;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./kfp-gcp.toml when present)
    #[arg(long, global = true, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Cloud project that owns jobs and mirrored images
    #[arg(long, global = true, value_name = "ID", help_heading = "Configuration")]
    pub project: Option<String>,

    /// PipelineJobs API host
    #[arg(long, global = true, value_name = "HOST", help_heading = "Configuration")]
    pub api_host: Option<String>,
}

/// Inputs that turn a component file into a job document.
#[derive(Args, Debug, Clone)]
pub struct PipelineInputArgs {
    /// Component document (YAML or JSON) with a graph implementation
    #[arg(value_name = "COMPONENT")]
    pub component: PathBuf,

    /// Storage URI for job outputs (default: pipeline.root from config)
    #[arg(long, value_name = "URI")]
    pub pipeline_root: Option<String>,

    /// Pipeline argument; repeatable
    #[arg(long = "arg", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub arguments: Vec<(String, String)>,

    /// YAML or JSON mapping of pipeline arguments; --arg entries win
    #[arg(long, value_name = "FILE")]
    pub arguments_file: Option<PathBuf>,

    /// Pipeline context name (default: pipeline.context from config)
    #[arg(long, value_name = "NAME")]
    pub pipeline_context: Option<String>,

    /// Artifact copy tool used inside containers
    #[arg(long, value_name = "TOOL")]
    pub staging_tool: Option<StagingTool>,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub pipeline: PipelineInputArgs,

    /// Write the job document here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MirrorArgs {
    /// Job document produced by `compile`
    #[arg(value_name = "JOB_JSON")]
    pub job: PathBuf,

    /// Registry prefix for mirrored images (default: gcr.io/<project>/mirror/)
    #[arg(long, value_name = "PREFIX")]
    pub mirror_prefix: Option<String>,

    /// Write the rewritten document here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Polling controls shared by commands that can wait.
#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Give up after this long, e.g. 90m or 2h
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Time between status checks (default: api.poll_interval_seconds)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub interval: Option<Duration>,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Job document to submit
    #[arg(value_name = "JOB_JSON")]
    pub job: PathBuf,

    /// Job name (default: generated from the current time)
    #[arg(long, value_name = "NAME")]
    pub job_name: Option<String>,

    /// Poll until the job finishes
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineInputArgs,

    /// Job name (default: generated from the current time)
    #[arg(long, value_name = "NAME")]
    pub job_name: Option<String>,

    /// Submit images as-is instead of mirroring them
    #[arg(long)]
    pub no_mirror: bool,

    /// Registry prefix for mirrored images (default: gcr.io/<project>/mirror/)
    #[arg(long, value_name = "PREFIX")]
    pub mirror_prefix: Option<String>,

    /// Poll until the job finishes
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Job name
    #[arg(value_name = "JOB")]
    pub job: String,
}

#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Job name
    #[arg(value_name = "JOB")]
    pub job: String,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CancelArgs {
    /// Job name
    #[arg(value_name = "JOB")]
    pub job: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err(format!("argument name is empty in '{}'", raw));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(raw)
        .map_err(|err| format!("invalid duration '{}': {}", raw, err))?;
    if duration.is_zero() {
        return Err(format!("duration must be greater than zero, got '{}'", raw));
    }
    Ok(duration)
}
