use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults that stop the sampling loop without being reported through the API callback
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Failed to render system prompt: {0}")]
    Prompt(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request carries {found} cache breakpoints, the limit is {limit}")]
    CacheBudgetExceeded { found: usize, limit: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures raised by a tool. The loop turns these into error results for the model.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool {0} is invalid")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from the backend call. `Transport` means no HTTP response was received.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response format from the API: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}
