//! Error types for the patch pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error for a pipeline run.
///
/// Only fatal conditions end up here; per-job failures stay inside the
/// apply report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Proposal error: {0}")]
    Proposal(#[from] ProposalError),

    #[error("Pipeline failed during {phase}: {source}")]
    Pipeline {
        phase: crate::pipeline::PipelineState,
        #[source]
        source: Box<Error>,
    },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Prompt template is missing the {placeholder} placeholder")]
    MissingPlaceholder { placeholder: &'static str },

    #[error("Task prompt pool is empty")]
    NoTasks,
}

/// Errors raised while reading the workspace, the task pool or the template.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the change proposer.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Response does not match the proposal schema: {reason}")]
    SchemaMismatch { reason: String },
}

/// A single modify-job could not be applied. Never fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("Invalid line number {value:?} for {op} job")]
    InvalidLineNumber { op: &'static str, value: String },
}

/// Notification delivery errors. Logged, never propagated past the notifier.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
