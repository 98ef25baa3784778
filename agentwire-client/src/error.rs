//! Error types for the HTTP client

use agentwire_core::{AgentError, BackendError};
use thiserror::Error;

/// Errors from building or talking to a remote agent endpoint
#[derive(Debug, Error)]
pub enum HttpAgentError {
    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configured header name or value is not valid HTTP
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or the body could not be read
    #[error("Network error: {0}")]
    Network(String),
}

impl HttpAgentError {
    /// Classify a reqwest failure
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpAgentError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            HttpAgentError::Network(format!("Connection failed: {}", err))
        } else {
            HttpAgentError::Network(err.to_string())
        }
    }
}

impl From<HttpAgentError> for AgentError {
    fn from(err: HttpAgentError) -> Self {
        match err {
            HttpAgentError::Configuration(_) | HttpAgentError::InvalidHeader { .. } => {
                AgentError::Other(err.to_string())
            }
            HttpAgentError::Status { .. } | HttpAgentError::Network(_) => {
                AgentError::Transport(err.to_string())
            }
        }
    }
}

impl From<HttpAgentError> for BackendError {
    fn from(err: HttpAgentError) -> Self {
        match err {
            HttpAgentError::Status { status, body } => BackendError::Status { status, body },
            HttpAgentError::Network(msg) => BackendError::Connection(msg),
            other => BackendError::Other(other.to_string()),
        }
    }
}
