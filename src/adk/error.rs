// SPDX-License-Identifier: MIT

//! Typed error handling for ragflow-rs
//!
//! `RagflowError` is the error returned by collaborators (models, tools,
//! document repositories). `WorkflowError` is returned by the workflow engine
//! and separates workflow-fatal step failures from engine defects.

use crate::ragflow::workflow::schema::ValidationError;
use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T, E = RagflowError> = std::result::Result<T, E>;

/// Top-level error type for ragflow-rs
#[derive(Debug, Error)]
pub enum RagflowError {
    /// API errors from external services (Anthropic, Confluence, etc.)
    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model/LLM errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Workflow engine errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the workflow engine
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The invocation input does not satisfy the workflow input contract
    #[error("Input for workflow '{workflow}' rejected: {source}")]
    InvalidInput {
        workflow: String,
        source: ValidationError,
    },

    /// The value handed to a step does not satisfy its input contract
    #[error("Step '{step}' received input violating its contract: {source}")]
    StepInputMismatch {
        step: String,
        source: ValidationError,
    },

    /// A step returned output that does not satisfy its own output contract
    #[error("Step '{step}' produced output violating its contract: {source}")]
    StepOutputMismatch {
        step: String,
        source: ValidationError,
    },

    /// The last step's output does not satisfy the workflow output contract
    #[error("Output of workflow '{workflow}' violates its contract: {source}")]
    InvalidOutput {
        workflow: String,
        source: ValidationError,
    },

    /// A step aborted the run
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// A typed step or invocation could not convert its payload
    #[error("'{owner}' could not convert its payload: {source}")]
    Payload {
        owner: String,
        source: serde_json::Error,
    },

    /// Adjacent steps declare contracts that cannot line up
    #[error("Step '{consumer}' cannot consume the output of '{producer}': {reason}")]
    IncompatibleSteps {
        producer: String,
        consumer: String,
        reason: String,
    },

    /// A contract could not be built
    #[error("Invalid schema for '{owner}': {message}")]
    InvalidSchema { owner: String, message: String },

    #[error("Workflow '{0}' has no steps")]
    Empty(String),

    #[error("Duplicate step id '{0}'")]
    DuplicateStep(String),

    #[error("Workflow '{0}' not found")]
    NotFound(String),
}

/// Coarse classification of a workflow failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The caller supplied input that the workflow does not accept
    InvalidInput,
    /// A step decided that the run cannot continue
    Fatal,
    /// A programming error: contracts do not hold or the workflow is malformed
    Defect,
    NotFound,
}

impl WorkflowError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkflowError::InvalidInput { .. } => FailureKind::InvalidInput,
            WorkflowError::StepFailed { .. } => FailureKind::Fatal,
            WorkflowError::NotFound(_) => FailureKind::NotFound,
            _ => FailureKind::Defect,
        }
    }

    /// True when the failure indicates a bug rather than a runtime condition
    pub fn is_defect(&self) -> bool {
        self.kind() == FailureKind::Defect
    }

    pub fn step_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Model provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl RagflowError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for RagflowError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for RagflowError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
