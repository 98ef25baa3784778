//! Error types for agent runs.
//!
//! [`AgentError`] is the error carried by every agent stream. Errors that
//! happen before `RUN_STARTED` reach the consumer as stream errors; errors
//! after it are turned into a `RUN_ERROR` event by the run guard.

use thiserror::Error;

use crate::backend::BackendError;
use crate::encoding::DecodeError;
use crate::input::InputError;
use crate::verify::ProtocolViolation;

/// Errors that can occur while running an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The run input failed validation
    #[error("invalid run input: {0}")]
    Input(#[from] InputError),

    /// The delegated backend failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The transform stage received an event it cannot rewrite
    #[error("transform error: {0}")]
    Transform(String),

    /// A received frame could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Received events break span or run ordering
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Network or HTTP failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The agent stream ended without emitting any event
    #[error("agent stream ended before RUN_STARTED")]
    EmptyRun,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Machine readable code used for the `RUN_ERROR` event.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AgentError::Input(_) => Some("invalid_input"),
            AgentError::Backend(_) => Some("backend_error"),
            AgentError::Transform(_) => Some("transform_error"),
            AgentError::Decode(_) => Some("decode_error"),
            AgentError::Protocol(_) => Some("protocol_error"),
            AgentError::Transport(_) => Some("transport_error"),
            AgentError::EmptyRun => Some("empty_run"),
            AgentError::Other(_) => None,
        }
    }

    /// Returns true if the failure came from the network or a remote backend
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AgentError::Backend(_)
                | AgentError::Transport(_)
                | AgentError::Decode(_)
                | AgentError::Protocol(_)
        )
    }
}

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
