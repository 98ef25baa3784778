//! Protocol event types.
//!
//! The event set is closed: a run is described entirely by the ten kinds in
//! [`EventKind`]. Events are serialized with a `type` field in
//! SCREAMING_SNAKE_CASE and camelCase field names. Decoding also accepts the
//! snake_case field spelling used by older producers, but encoding only ever
//! emits camelCase.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::{Message, Role};

/// A single protocol event.
///
/// The `timestamp` is assigned by the producer (milliseconds since the Unix
/// epoch). It is informative only; stream order is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Kind-specific payload, including the `type` tag.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Producer-assigned timestamp in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// The closed set of event kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EventKind {
    // ===== Lifecycle Events =====
    /// First event of every run.
    RunStarted {
        #[serde(alias = "thread_id")]
        thread_id: String,
        #[serde(alias = "run_id")]
        run_id: String,
    },

    /// Last event of a successful run.
    RunFinished {
        #[serde(alias = "thread_id")]
        thread_id: String,
        #[serde(alias = "run_id")]
        run_id: String,
    },

    /// Last event of a failed run. Replaces `RunFinished`.
    RunError {
        #[serde(alias = "thread_id")]
        thread_id: String,
        #[serde(alias = "run_id")]
        run_id: String,
        /// Human readable failure description.
        message: String,
        /// Optional machine readable error code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    // ===== Text Message Events =====
    /// Opens a text message span.
    TextMessageStart {
        #[serde(alias = "message_id")]
        message_id: String,
        role: Role,
    },

    /// Appends a delta to an open text message span.
    TextMessageContent {
        #[serde(alias = "message_id")]
        message_id: String,
        delta: String,
    },

    /// Closes a text message span.
    TextMessageEnd {
        #[serde(alias = "message_id")]
        message_id: String,
    },

    // ===== Tool Call Events =====
    /// Opens a tool call span.
    ToolCallStart {
        #[serde(alias = "tool_call_id")]
        tool_call_id: String,
        #[serde(alias = "tool_call_name")]
        tool_call_name: String,
        #[serde(
            default,
            alias = "parent_message_id",
            skip_serializing_if = "Option::is_none"
        )]
        parent_message_id: Option<String>,
    },

    /// Appends a JSON argument fragment to an open tool call span.
    ToolCallArgs {
        #[serde(alias = "tool_call_id")]
        tool_call_id: String,
        delta: String,
    },

    /// Closes a tool call span.
    ToolCallEnd {
        #[serde(alias = "tool_call_id")]
        tool_call_id: String,
    },

    // ===== State Events =====
    /// Replaces the receiver's entire reconstructed history.
    MessagesSnapshot { messages: Vec<Message> },
}

/// Discriminant of [`EventKind`], useful for assertions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    RunStarted,
    RunFinished,
    RunError,
    TextMessageStart,
    TextMessageContent,
    TextMessageEnd,
    ToolCallStart,
    ToolCallArgs,
    ToolCallEnd,
    MessagesSnapshot,
}

impl EventType {
    /// The wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunFinished => "RUN_FINISHED",
            EventType::RunError => "RUN_ERROR",
            EventType::TextMessageStart => "TEXT_MESSAGE_START",
            EventType::TextMessageContent => "TEXT_MESSAGE_CONTENT",
            EventType::TextMessageEnd => "TEXT_MESSAGE_END",
            EventType::ToolCallStart => "TOOL_CALL_START",
            EventType::ToolCallArgs => "TOOL_CALL_ARGS",
            EventType::ToolCallEnd => "TOOL_CALL_END",
            EventType::MessagesSnapshot => "MESSAGES_SNAPSHOT",
        }
    }

    /// Returns true for `RunFinished` and `RunError`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::RunFinished | EventType::RunError)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::RunStarted { .. } => EventType::RunStarted,
            EventKind::RunFinished { .. } => EventType::RunFinished,
            EventKind::RunError { .. } => EventType::RunError,
            EventKind::TextMessageStart { .. } => EventType::TextMessageStart,
            EventKind::TextMessageContent { .. } => EventType::TextMessageContent,
            EventKind::TextMessageEnd { .. } => EventType::TextMessageEnd,
            EventKind::ToolCallStart { .. } => EventType::ToolCallStart,
            EventKind::ToolCallArgs { .. } => EventType::ToolCallArgs,
            EventKind::ToolCallEnd { .. } => EventType::ToolCallEnd,
            EventKind::MessagesSnapshot { .. } => EventType::MessagesSnapshot,
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event::new(kind)
    }
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Create an event without a timestamp.
    pub fn without_timestamp(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Returns true if this event ends a run.
    pub fn is_terminal(&self) -> bool {
        self.event_type().is_terminal()
    }

    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::new(EventKind::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        })
    }

    pub fn run_finished(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::new(EventKind::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        })
    }

    pub fn run_error(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::RunError {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            message: message.into(),
            code: None,
        })
    }

    pub fn text_message_start(message_id: impl Into<String>, role: Role) -> Self {
        Self::new(EventKind::TextMessageStart {
            message_id: message_id.into(),
            role,
        })
    }

    pub fn text_message_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
        })
    }

    pub fn text_message_end(message_id: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageEnd {
            message_id: message_id.into(),
        })
    }

    pub fn tool_call_start(
        tool_call_id: impl Into<String>,
        tool_call_name: impl Into<String>,
        parent_message_id: Option<String>,
    ) -> Self {
        Self::new(EventKind::ToolCallStart {
            tool_call_id: tool_call_id.into(),
            tool_call_name: tool_call_name.into(),
            parent_message_id,
        })
    }

    pub fn tool_call_args(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallArgs {
            tool_call_id: tool_call_id.into(),
            delta: delta.into(),
        })
    }

    pub fn tool_call_end(tool_call_id: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallEnd {
            tool_call_id: tool_call_id.into(),
        })
    }

    pub fn messages_snapshot(messages: Vec<Message>) -> Self {
        Self::new(EventKind::MessagesSnapshot { messages })
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
