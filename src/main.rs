use clap::Parser;
use kfp_gcp::cli::{self, Args};
use kfp_gcp::core::{DefaultErrorReporter, ErrorReporter};
use kfp_gcp::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let reporter = DefaultErrorReporter::new();

    let _guard = match logging::init(&args.command, args.global.config.as_deref()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            reporter.report_warning("logging disabled", Some(format!("{:#}", err)));
            None
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            reporter.report_error(&err);
            ExitCode::FAILURE
        }
    }
}
