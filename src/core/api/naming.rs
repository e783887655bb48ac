use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Job name derived from the current local time, e.g.
/// `job-2024-05-01t13-45-10-123456`.
pub fn generate_job_name() -> String {
    job_name_from_timestamp(Local::now().naive_local())
}

pub fn job_name_from_timestamp(timestamp: NaiveDateTime) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid =
        INVALID.get_or_init(|| Regex::new(r"[^-a-zA-Z0-9]").expect("valid job name pattern"));

    let raw = format!("job-{}", timestamp.format("%Y-%m-%dT%H:%M:%S%.6f")).to_lowercase();
    invalid.replace_all(&raw, "-").trim_matches('-').to_string()
}
