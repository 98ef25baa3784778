//! Run input model: the immutable description of one run request.
//!
//! [`RunAgentInput`] is built once by the caller and handed to an agent by
//! value. Field names are camelCase on the wire; the snake_case spelling
//! (`thread_id`, `run_id`, `tool_call_id`, ...) is accepted on decode for
//! older clients.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message author role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    Tool,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::System => "system",
        }
    }
}

/// A conversation message.
///
/// Tagged by `role`. Only assistant messages carry tool calls and only tool
/// messages carry the id of the call they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Message {
    User {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        content: Option<String>,
        #[serde(default, alias = "tool_calls", skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        content: Option<String>,
        #[serde(alias = "tool_call_id")]
        tool_call_id: String,
    },
    System {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            id: None,
            content: Some(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            id: None,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// An assistant message that only requests tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            id: None,
            content: None,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            id: None,
            content: Some(content.into()),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            id: None,
            content: Some(content.into()),
        }
    }

    /// Set the message id.
    pub fn with_id(mut self, message_id: impl Into<String>) -> Self {
        match &mut self {
            Message::User { id, .. }
            | Message::Assistant { id, .. }
            | Message::Tool { id, .. }
            | Message::System { id, .. } => *id = Some(message_id.into()),
        }
        self
    }

    pub fn role(&self) -> Role {
        match self {
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
            Message::System { .. } => Role::System,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Message::User { id, .. }
            | Message::Assistant { id, .. }
            | Message::Tool { id, .. }
            | Message::System { id, .. } => id.as_deref(),
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Message::User { content, .. }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. }
            | Message::System { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls requested by this message (empty unless assistant).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// A tool invocation requested by an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within a run.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse the accumulated argument string as JSON.
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.function.arguments)
    }
}

/// A tool the caller makes available to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema for the tool parameters.
    #[serde(default)]
    pub parameters: Value,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Input for one agent run.
///
/// Equality is by field value; agents must not rely on object identity since
/// the input may have crossed a network hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    /// Conversation identity.
    #[serde(alias = "thread_id")]
    pub thread_id: String,
    /// Unique per invocation.
    #[serde(alias = "run_id")]
    pub run_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// Opaque client state.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub state: Value,
    /// Properties forwarded verbatim from the client.
    #[serde(default, alias = "forwarded_props", skip_serializing_if = "Value::is_null")]
    pub forwarded_props: Value,
}

/// Errors from [`RunAgentInput::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("threadId must not be empty")]
    MissingThreadId,

    #[error("runId must not be empty")]
    MissingRunId,

    /// A tool message answers a call no earlier assistant message made.
    #[error("message {index} references unknown tool call '{tool_call_id}'")]
    UnknownToolCall { index: usize, tool_call_id: String },

    #[error("tool '{0}' is declared more than once")]
    DuplicateTool(String),
}

impl RunAgentInput {
    /// Create an input with no messages or tools.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            state: Value::Null,
            forwarded_props: Value::Null,
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn with_forwarded_props(mut self, props: Value) -> Self {
        self.forwarded_props = props;
        self
    }

    /// Content of the last message in the history, if any.
    pub fn last_message_content(&self) -> Option<&str> {
        self.messages.last().and_then(Message::content)
    }

    /// Content of the most recent user message, if any.
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .and_then(Message::content)
    }

    /// Check the input before a run starts.
    ///
    /// Rejects empty ids, duplicate tool declarations, and tool messages whose
    /// `toolCallId` was not emitted by an earlier assistant message.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.thread_id.trim().is_empty() {
            return Err(InputError::MissingThreadId);
        }
        if self.run_id.trim().is_empty() {
            return Err(InputError::MissingRunId);
        }

        let mut tool_names = HashSet::new();
        for tool in &self.tools {
            if !tool_names.insert(tool.name.as_str()) {
                return Err(InputError::DuplicateTool(tool.name.clone()));
            }
        }

        let mut known_calls = HashSet::new();
        for (index, message) in self.messages.iter().enumerate() {
            match message {
                Message::Assistant { tool_calls, .. } => {
                    known_calls.extend(tool_calls.iter().map(|c| c.id.as_str()));
                }
                Message::Tool { tool_call_id, .. } => {
                    if !known_calls.contains(tool_call_id.as_str()) {
                        return Err(InputError::UnknownToolCall {
                            index,
                            tool_call_id: tool_call_id.clone(),
                        });
                    }
                }
                Message::User { .. } | Message::System { .. } => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
