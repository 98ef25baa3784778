//! Error types for the agentwire server.

use agentwire_core::{AgentError, InputError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors that can occur when building a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No agents were registered.
    #[error("No agents registered. Call .agent() before .build()")]
    NoAgents,

    /// An agent name cannot be used as a path segment.
    #[error("Invalid agent name '{0}': must be non-empty and must not contain '/'")]
    InvalidAgentName(String),

    /// Two agents were registered under the same name.
    #[error("Agent '{0}' is registered more than once")]
    DuplicateAgent(String),
}

/// Errors returned before a run has started streaming.
///
/// Once the first event has been sent, failures are reported in-band as
/// `RUN_ERROR` instead.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No agent is registered under the requested name.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// The request body could not be parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The run input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// The agent failed before emitting `RUN_STARTED`.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) | ServerError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Agent(AgentError::Input(_)) => StatusCode::BAD_REQUEST,
            ServerError::Agent(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::warn!("request failed: {}", self);
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
