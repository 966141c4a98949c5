//! Error types shared across subsystems.
//!
//! # Design Decisions
//! - Instrumentation errors (`RecordError`) never escape a request path;
//!   callers log and drop them
//! - Startup errors (`ConfigError`, `InstallError`) are returned to the host
//! - Errors observed inside an instrumented call are never wrapped here;
//!   they flow back to the caller unchanged

use crate::config::validation::ValidationError;

/// Failure to record an observation against a registry.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("registry rejected meter '{name}': {reason}")]
    Rejected { name: String, reason: String },

    #[error("registry is closed")]
    Closed,
}

/// Failure to load the metrics configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure to install a collaborator at startup.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("no meter registry available")]
    MissingRegistry,

    #[error("collaborator '{0}' is disabled by configuration")]
    Disabled(&'static str),

    #[error("binder failed: {0}")]
    Binder(#[from] BinderError),

    #[error("metrics exporter failed: {0}")]
    Exporter(String),
}

/// Failure to read process or runtime statistics.
#[derive(Debug, thiserror::Error)]
pub enum BinderError {
    #[error("process statistics are not available on this platform")]
    Unsupported,

    #[error("failed to read process statistics: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed process statistics: {0}")]
    Malformed(String),

    #[error("a logging binder is already installed")]
    AlreadyInstalled,
}
