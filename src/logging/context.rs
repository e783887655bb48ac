use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Commands driven from a terminal.
    Interactive,
    /// Commands whose result document goes to stdout; logs must stay off it.
    DocumentOutput,
    /// Scripted runs that should be quiet on the console.
    Batch,
}

impl ExecutionContext {
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::Batch)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if batch_override_enabled() {
        return ExecutionContext::Batch;
    }

    match command {
        Command::Compile(args) if args.output.is_none() => ExecutionContext::DocumentOutput,
        Command::Mirror(args) if args.output.is_none() => ExecutionContext::DocumentOutput,
        Command::Status(_) | Command::List(_) => ExecutionContext::DocumentOutput,
        Command::Compile(_)
        | Command::Mirror(_)
        | Command::Submit(_)
        | Command::Run(_)
        | Command::Wait(_)
        | Command::Cancel(_) => ExecutionContext::Interactive,
    }
}

fn batch_override_enabled() -> bool {
    env::var("KFP_GCP_BATCH")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
