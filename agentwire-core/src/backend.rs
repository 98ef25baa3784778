//! Backends for the delegating agent.
//!
//! An [`AgentBackend`] is a remote agent runtime that answers a conversation
//! with a stream of [`BackendPart`]s. The delegating agent turns those parts
//! into protocol events; backends never see protocol events themselves.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::input::Message;

/// One part of a backend's streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendPart {
    /// Incremental assistant text
    Text(String),
    /// A complete tool call with parsed arguments
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    /// The backend started streaming a tool call
    ToolCallStreamingStart {
        tool_call_id: String,
        tool_name: String,
    },
    /// A fragment of a streaming tool call's arguments
    ToolCallDelta {
        tool_call_id: String,
        args_text_delta: String,
    },
    /// Result of a tool the backend executed itself
    ToolResult { tool_call_id: String, result: Value },
    /// The backend finished answering
    Finish { reason: Option<String> },
}

/// A message in the backend's conversation format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum BackendMessage {
    User { content: String },
    Assistant { content: Vec<AssistantPart> },
    Tool { content: Vec<ToolResultPart> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AssistantPart {
    Text {
        text: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ToolResultPart {
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        result: Option<String>,
    },
}

/// Request sent to a backend for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRequest {
    /// Backend-side agent to invoke. Addressed by the backend, not sent in
    /// the body.
    #[serde(skip)]
    pub agent_id: String,
    pub thread_id: String,
    pub run_id: String,
    pub messages: Vec<BackendMessage>,
}

/// Stream of parts answering one [`BackendRequest`].
pub type BackendStream = BoxStream<'static, Result<BackendPart, BackendError>>;

/// Errors reported by a backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend could not be reached
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backend answered with a non-success status
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend reported an error mid-stream
    #[error("stream failed: {0}")]
    Stream(String),

    /// The backend sent something that could not be understood
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

/// A remote agent runtime.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Start answering `request`.
    ///
    /// Fails if the backend cannot be contacted at all; failures after the
    /// answer has started are reported through the stream.
    async fn stream(&self, request: BackendRequest) -> Result<BackendStream, BackendError>;
}

/// Convert protocol history into backend messages.
///
/// System messages are not forwarded. Tool-call arguments that are not valid
/// JSON are passed on as a JSON string.
pub fn convert_messages(messages: &[Message]) -> Vec<BackendMessage> {
    let mut result = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::User { content, .. } => result.push(BackendMessage::User {
                content: content.clone().unwrap_or_default(),
            }),
            Message::Assistant {
                content,
                tool_calls,
                ..
            } => {
                let mut parts = Vec::new();
                if let Some(text) = content.as_deref().filter(|text| !text.is_empty()) {
                    parts.push(AssistantPart::Text {
                        text: text.to_string(),
                    });
                }
                for call in tool_calls {
                    let args = call
                        .parsed_arguments()
                        .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));
                    parts.push(AssistantPart::ToolCall {
                        tool_call_id: call.id.clone(),
                        tool_name: call.function.name.clone(),
                        args,
                    });
                }
                result.push(BackendMessage::Assistant { content: parts });
            }
            Message::Tool {
                content,
                tool_call_id,
                ..
            } => result.push(BackendMessage::Tool {
                content: vec![ToolResultPart::ToolResult {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: "unknown".to_string(),
                    result: content.clone(),
                }],
            }),
            Message::System { .. } => {
                log::debug!("system message not forwarded to backend");
            }
        }
    }

    result
}
