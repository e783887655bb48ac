pub mod args;
pub mod commands;

pub use args::{
    CancelArgs, CompileArgs, GlobalArgs, ListArgs, MirrorArgs, PipelineInputArgs, PollArgs,
    RunArgs, StatusArgs, SubmitArgs, WaitArgs,
};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PIPELINE COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "kfp-gcp")]
#[command(version = crate::VERSION)]
#[command(about = "Run Kubeflow Pipelines component graphs on Cloud AI Platform managed pipelines")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: compile a component graph, mirror its images, submit it, then wait for the job."
)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Translate a component graph into a job document",
        long_about = "Compile turns a graph component and its arguments into a PipelineJob document with staged inputs and typed output artifacts. Nothing is sent anywhere.",
        after_help = "Example:\n    kfp-gcp compile pipeline.yaml --pipeline-root gs://bucket/root --arg text=hello -o job.json"
    )]
    Compile(CompileArgs),
    #[command(
        about = "Copy untrusted images into the project registry",
        long_about = "Mirror checks every image outside the trusted registries, copies missing ones with a Cloud Build job and rewrites the document to use the copies.",
        after_help = "Example:\n    kfp-gcp mirror job.json -o mirrored.json"
    )]
    Mirror(MirrorArgs),
    #[command(
        about = "Submit a job document",
        long_about = "Submit posts a compiled job document to the PipelineJobs API and prints the job name.",
        after_help = "Example:\n    kfp-gcp submit mirrored.json --job-name nightly-1 --wait"
    )]
    Submit(SubmitArgs),
    #[command(
        about = "Compile, mirror and submit in one step",
        long_about = "Run compiles the component, mirrors images unless disabled, submits the job and optionally waits for it.",
        after_help = "Example:\n    kfp-gcp run pipeline.yaml --pipeline-root gs://bucket/root --wait --timeout 2h"
    )]
    Run(RunArgs),
    #[command(
        about = "Print the current job document",
        after_help = "Example:\n    kfp-gcp status job-2024-05-01t13-45-10-123456"
    )]
    Status(StatusArgs),
    #[command(
        about = "Poll a job until it finishes",
        long_about = "Wait polls the job at a fixed interval and exits non-zero unless it succeeds.",
        after_help = "Example:\n    kfp-gcp wait nightly-1 --timeout 90m --interval 30s"
    )]
    Wait(WaitArgs),
    #[command(
        about = "Request cancellation of a job",
        after_help = "Example:\n    kfp-gcp cancel nightly-1"
    )]
    Cancel(CancelArgs),
    #[command(about = "List jobs in the project")]
    List(ListArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let global = args.global;
    match args.command {
        Command::Compile(compile_args) => commands::compile(&global, compile_args).await,
        Command::Mirror(mirror_args) => commands::mirror(&global, mirror_args).await,
        Command::Submit(submit_args) => commands::submit(&global, submit_args).await,
        Command::Run(run_args) => commands::run(&global, run_args).await,
        Command::Status(status_args) => commands::status(&global, status_args).await,
        Command::Wait(wait_args) => commands::wait(&global, wait_args).await,
        Command::Cancel(cancel_args) => commands::cancel(&global, cancel_args).await,
        Command::List(_) => commands::list(&global).await,
    }
}
