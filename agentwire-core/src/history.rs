//! Rebuilding conversation history from an event stream.
//!
//! This is the consumer side of the protocol: a client that receives events
//! feeds them to a [`HistoryBuilder`] to get back the message list the agent
//! produced. `MESSAGES_SNAPSHOT` replaces the whole history; it is never
//! merged with earlier granular events.

use std::collections::HashMap;

use crate::events::{Event, EventKind};
use crate::input::{Message, Role, ToolCall};
use crate::verify::ProtocolViolation;

/// Accumulates events into a list of [`Message`]s.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuilder {
    messages: Vec<Message>,
    /// messageId -> index of the message being streamed
    open_messages: HashMap<String, usize>,
    /// toolCallId -> (message index, tool call index)
    open_tool_calls: HashMap<String, (usize, usize)>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing history, e.g. the messages of the run input.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Returns true while any message or tool-call span is open.
    pub fn has_open_spans(&self) -> bool {
        !self.open_messages.is_empty() || !self.open_tool_calls.is_empty()
    }

    /// Apply every event in order.
    pub fn apply_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<(), ProtocolViolation> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &Event) -> Result<(), ProtocolViolation> {
        match &event.kind {
            EventKind::RunStarted { .. }
            | EventKind::RunFinished { .. }
            | EventKind::RunError { .. } => {}

            EventKind::TextMessageStart { message_id, role } => {
                if self.open_messages.contains_key(message_id) {
                    return Err(ProtocolViolation::MessageAlreadyOpen(message_id.clone()));
                }
                self.messages.push(empty_message(message_id, *role));
                self.open_messages
                    .insert(message_id.clone(), self.messages.len() - 1);
            }

            EventKind::TextMessageContent { message_id, delta } => {
                let index = *self
                    .open_messages
                    .get(message_id)
                    .ok_or_else(|| ProtocolViolation::MessageNotOpen(message_id.clone()))?;
                append_content(&mut self.messages[index], delta);
            }

            EventKind::TextMessageEnd { message_id } => {
                self.open_messages
                    .remove(message_id)
                    .ok_or_else(|| ProtocolViolation::MessageNotOpen(message_id.clone()))?;
            }

            EventKind::ToolCallStart {
                tool_call_id,
                tool_call_name,
                parent_message_id,
            } => {
                if self.open_tool_calls.contains_key(tool_call_id) {
                    return Err(ProtocolViolation::ToolCallAlreadyOpen(tool_call_id.clone()));
                }
                let message_index = self.tool_call_parent(parent_message_id.as_deref());
                if let Message::Assistant { tool_calls, .. } = &mut self.messages[message_index] {
                    tool_calls.push(ToolCall::new(tool_call_id, tool_call_name, ""));
                    self.open_tool_calls
                        .insert(tool_call_id.clone(), (message_index, tool_calls.len() - 1));
                }
            }

            EventKind::ToolCallArgs {
                tool_call_id,
                delta,
            } => {
                let (message_index, call_index) = *self
                    .open_tool_calls
                    .get(tool_call_id)
                    .ok_or_else(|| ProtocolViolation::ToolCallNotOpen(tool_call_id.clone()))?;
                if let Message::Assistant { tool_calls, .. } = &mut self.messages[message_index] {
                    tool_calls[call_index].function.arguments.push_str(delta);
                }
            }

            EventKind::ToolCallEnd { tool_call_id } => {
                self.open_tool_calls
                    .remove(tool_call_id)
                    .ok_or_else(|| ProtocolViolation::ToolCallNotOpen(tool_call_id.clone()))?;
            }

            EventKind::MessagesSnapshot { messages } => {
                self.messages = messages.clone();
                self.open_messages.clear();
                self.open_tool_calls.clear();
            }
        }

        Ok(())
    }

    /// Index of the assistant message a new tool call belongs to.
    ///
    /// Uses the named parent when it is an assistant message in the history,
    /// otherwise appends a fresh assistant message.
    fn tool_call_parent(&mut self, parent_message_id: Option<&str>) -> usize {
        if let Some(parent) = parent_message_id {
            let found = self.messages.iter().rposition(|m| {
                m.role() == Role::Assistant && m.id() == Some(parent)
            });
            if let Some(index) = found {
                return index;
            }
        }

        let mut message = Message::assistant_tool_calls(Vec::new());
        if let Some(parent) = parent_message_id {
            message = message.with_id(parent);
        }
        self.messages.push(message);
        self.messages.len() - 1
    }
}

fn empty_message(message_id: &str, role: Role) -> Message {
    let message = match role {
        Role::User => Message::user(""),
        Role::Assistant => Message::assistant(""),
        Role::System => Message::system(""),
        Role::Tool => Message::tool("", ""),
    };
    message.with_id(message_id)
}

fn append_content(message: &mut Message, delta: &str) {
    match message {
        Message::User { content, .. }
        | Message::Assistant { content, .. }
        | Message::Tool { content, .. }
        | Message::System { content, .. } => {
            content.get_or_insert_with(String::new).push_str(delta);
        }
    }
}
