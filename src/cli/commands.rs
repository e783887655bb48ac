use crate::{
    cli::args::{
        CancelArgs, CompileArgs, GlobalArgs, MirrorArgs, PipelineInputArgs, PollArgs, RunArgs,
        StatusArgs, SubmitArgs, WaitArgs,
    },
    core::{
        api::{
            ApiError, GcloudTokenProvider, PipelineJobApi, PipelineJobHandle, StaticTokenProvider,
            TokenProvider,
        },
        component::load_component,
        config::{ConfigLoader, ConfigValidator, KfpGcpConfig},
        gcloud::Gcloud,
        mirror::{ImageMirror, MirrorError},
        pipeline_job::PipelineJob,
        runner::{run_pipeline, RunError, RunOptions},
        translator::{compile_pipeline, CompileOptions, TranslateError},
        AppError, ErrorCategory,
    },
    Result,
};
use anyhow::Context;
use indexmap::IndexMap;
use serde_json::Value;
use std::{fs, path::Path, sync::Arc};

pub async fn compile(global: &GlobalArgs, args: CompileArgs) -> Result<()> {
    let config = load_config(global)?;
    let component = load_component(&args.pipeline.component)?;
    let arguments = pipeline_arguments(&args.pipeline)?;
    let options = compile_options(&config, &args.pipeline)?;

    let job = compile_pipeline(&component, &arguments, &options)
        .map_err(|err| translation_failed(&args.pipeline.component, err))?;
    tracing::info!(steps = job.spec.steps.len(), "compiled pipeline");
    emit_document(&job, args.output.as_deref())
}

pub async fn mirror(global: &GlobalArgs, args: MirrorArgs) -> Result<()> {
    let config = load_config(global)?;
    let job = PipelineJob::load(&args.job)?;
    let prefix = args
        .mirror_prefix
        .clone()
        .unwrap_or_else(|| config.mirror_prefix());

    let mirrored = image_mirror(&config)
        .mirror_and_replace_container_images(&job, &prefix)
        .await
        .map_err(mirror_failed)?;
    emit_document(&mirrored, args.output.as_deref())
}

pub async fn submit(global: &GlobalArgs, args: SubmitArgs) -> Result<()> {
    let config = load_config(global)?;
    let job = PipelineJob::load(&args.job)?;
    let api = pipeline_api(&config);

    let mut handle = api
        .submit_job(&job, args.job_name.as_deref().unwrap_or_default())
        .await
        .map_err(api_failed)?;
    tracing::info!(url = %api.console_url(handle.job_name()), "job console");
    println!("{}", handle.job_name());

    if args.wait {
        wait_for(&mut handle, &config, &args.poll).await?;
    }
    Ok(())
}

pub async fn run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let config = load_config(global)?;
    let component = load_component(&args.pipeline.component)?;
    let arguments = pipeline_arguments(&args.pipeline)?;
    let mirror_prefix = if args.no_mirror || !config.mirror.enabled {
        None
    } else {
        Some(
            args.mirror_prefix
                .clone()
                .unwrap_or_else(|| config.mirror_prefix()),
        )
    };
    let options = RunOptions {
        compile: compile_options(&config, &args.pipeline)?,
        job_name: args.job_name.clone(),
        mirror_prefix,
    };

    let api = pipeline_api(&config);
    let mut handle = run_pipeline(&component, &arguments, &options, &image_mirror(&config), &api)
        .await
        .map_err(|err| match err {
            RunError::Translate(err) => translation_failed(&args.pipeline.component, err),
            RunError::Mirror(err) => mirror_failed(err),
            RunError::Api(err) => api_failed(err),
        })?;
    println!("{}", handle.job_name());

    if args.wait {
        wait_for(&mut handle, &config, &args.poll).await?;
    }
    Ok(())
}

pub async fn status(global: &GlobalArgs, args: StatusArgs) -> Result<()> {
    let config = load_config(global)?;
    let document = pipeline_api(&config)
        .get_job_json(&args.job)
        .await
        .map_err(api_failed)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&document).map_err(serialization_failed)?
    );
    Ok(())
}

pub async fn wait(global: &GlobalArgs, args: WaitArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut handle = pipeline_api(&config).job(args.job);
    wait_for(&mut handle, &config, &args.poll).await
}

pub async fn cancel(global: &GlobalArgs, args: CancelArgs) -> Result<()> {
    let config = load_config(global)?;
    pipeline_api(&config)
        .cancel(&args.job)
        .await
        .map_err(api_failed)?;
    tracing::info!(job = %args.job, "cancellation requested");
    Ok(())
}

pub async fn list(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let jobs = pipeline_api(&config).list_jobs().await.map_err(api_failed)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&jobs).map_err(serialization_failed)?
    );
    Ok(())
}

/// File and environment settings with command-line flags applied on top.
fn load_config(global: &GlobalArgs) -> Result<KfpGcpConfig> {
    let mut config = ConfigLoader::load(global.config.as_deref())?;
    if let Some(project) = &global.project {
        config.project.id = project.clone();
    }
    if let Some(api_host) = &global.api_host {
        config.api.host = api_host.clone();
        config.api.base_url = None;
    }
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn pipeline_api(config: &KfpGcpConfig) -> PipelineJobApi {
    let tokens: Arc<dyn TokenProvider> = match &config.api.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
        None => Arc::new(GcloudTokenProvider::default()),
    };
    PipelineJobApi::with_base_url(config.project.id.clone(), &config.api_base_url(), tokens)
}

fn image_mirror(config: &KfpGcpConfig) -> ImageMirror {
    ImageMirror::new(Gcloud::default())
        .with_project(config.project.id.clone())
        .with_trusted_registries(config.mirror.trusted_registries.clone())
}

fn compile_options(config: &KfpGcpConfig, args: &PipelineInputArgs) -> Result<CompileOptions> {
    let pipeline_root = args
        .pipeline_root
        .clone()
        .or_else(|| config.pipeline.root.clone())
        .ok_or_else(|| {
            AppError::new(ErrorCategory::ValidationError, "pipeline root is required")
                .with_code("CLI-001")
                .with_suggestion("pass --pipeline-root gs://bucket/path or set pipeline.root")
        })?;
    Ok(CompileOptions {
        pipeline_root,
        pipeline_context: args
            .pipeline_context
            .clone()
            .unwrap_or_else(|| config.pipeline.context.clone()),
        staging_tool: args.staging_tool.unwrap_or(config.staging.tool),
    })
}

/// Arguments file entries first, then `--arg` pairs in order.
fn pipeline_arguments(args: &PipelineInputArgs) -> Result<IndexMap<String, Value>> {
    let mut arguments = match &args.arguments_file {
        Some(path) => read_arguments_file(path)?,
        None => IndexMap::new(),
    };
    for (name, value) in &args.arguments {
        arguments.insert(name.clone(), Value::String(value.clone()));
    }
    Ok(arguments)
}

fn read_arguments_file(path: &Path) -> Result<IndexMap<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read arguments file {}", path.display()))?;
    let arguments = serde_yaml::from_str::<Option<IndexMap<String, Value>>>(&content).map_err(
        |err| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("arguments file {} is not a mapping: {}", path.display(), err),
            )
            .with_code("CLI-002")
        },
    )?;
    Ok(arguments.unwrap_or_default())
}

fn emit_document(job: &PipelineJob, output: Option<&Path>) -> Result<()> {
    let document = job.to_pretty_json().map_err(serialization_failed)?;
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", document))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote job document");
        }
        None => println!("{}", document),
    }
    Ok(())
}

async fn wait_for(
    handle: &mut PipelineJobHandle,
    config: &KfpGcpConfig,
    poll: &PollArgs,
) -> Result<()> {
    let interval = poll.interval.unwrap_or_else(|| config.poll_interval());
    let state = handle
        .wait_for_completion(poll.timeout, interval)
        .await
        .map_err(api_failed)?;
    match state {
        Some(state) if state.is_successful() => {
            tracing::info!(job = %handle.job_name(), "job succeeded");
            println!("{}", state);
            Ok(())
        }
        Some(state) => {
            println!("{}", state);
            Err(AppError::new(
                ErrorCategory::ApiError,
                format!("job {} finished in state {}", handle.job_name(), state),
            )
            .with_code("CLI-003")
            .into())
        }
        None => Err(AppError::new(
            ErrorCategory::ApiError,
            format!("job {} reported no state", handle.job_name()),
        )
        .with_code("CLI-004")
        .into()),
    }
}

fn translation_failed(component: &Path, err: TranslateError) -> AppError {
    AppError::with_source(
        ErrorCategory::TranslationError,
        "failed to compile pipeline",
        Box::new(err),
    )
    .with_code("CLI-005")
    .with_context(component.display().to_string())
}

fn mirror_failed(err: MirrorError) -> AppError {
    AppError::with_source(
        ErrorCategory::MirrorError,
        "failed to mirror container images",
        Box::new(err),
    )
    .with_code("CLI-006")
    .with_suggestion("check that gcloud is authenticated and Cloud Build is enabled")
}

fn api_failed(err: ApiError) -> AppError {
    match err {
        ApiError::Timeout { .. } => {
            AppError::new(ErrorCategory::TimeoutError, err.to_string()).with_code("CLI-007")
        }
        err => AppError::with_source(
            ErrorCategory::ApiError,
            "pipeline jobs request failed",
            Box::new(err),
        )
        .with_code("CLI-008"),
    }
}

fn serialization_failed(err: serde_json::Error) -> AppError {
    AppError::with_source(
        ErrorCategory::SerializationError,
        "failed to serialize document",
        Box::new(err),
    )
    .with_code("CLI-009")
}
