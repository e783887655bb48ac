pub mod api;
pub mod component;
pub mod config;
pub mod error;
pub mod gcloud;
pub mod mirror;
pub mod pipeline_job;
pub mod runner;
pub mod translator;
pub mod types;

pub use config::{ConfigLoader, ConfigValidator, KfpGcpConfig};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use types::*;
