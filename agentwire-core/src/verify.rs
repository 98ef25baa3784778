//! Span and ordering checks for a run's event sequence.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::events::{Event, EventKind, EventType};

/// A producer emitted events that break the run protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("{0} emitted before RUN_STARTED")]
    BeforeRunStarted(EventType),

    #[error("RUN_STARTED emitted more than once")]
    DuplicateRunStarted,

    #[error("{0} emitted after the run ended")]
    AfterTerminal(EventType),

    #[error("{event} carries thread '{thread_id}' / run '{run_id}', expected '{expected_thread_id}' / '{expected_run_id}'")]
    RunMismatch {
        event: EventType,
        thread_id: String,
        run_id: String,
        expected_thread_id: String,
        expected_run_id: String,
    },

    #[error("text message '{0}' is already open")]
    MessageAlreadyOpen(String),

    #[error("text message '{0}' is not open")]
    MessageNotOpen(String),

    #[error("text message id '{0}' was already used by a closed message")]
    MessageReused(String),

    #[error("tool call '{0}' is already open")]
    ToolCallAlreadyOpen(String),

    #[error("tool call '{0}' is not open")]
    ToolCallNotOpen(String),

    #[error("tool call id '{0}' was already used by a closed tool call")]
    ToolCallReused(String),

    #[error("RUN_FINISHED emitted with open spans: {0:?}")]
    OpenSpansAtFinish(Vec<String>),

    #[error("run ended without RUN_FINISHED or RUN_ERROR")]
    MissingTerminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running { thread_id: String, run_id: String },
    Ended,
}

/// Tracks open message and tool-call spans for one run.
///
/// Feed every event to [`observe`](Self::observe) in stream order, then call
/// [`finish`](Self::finish) once the stream has ended.
#[derive(Debug, Clone)]
pub struct SpanVerifier {
    phase: Phase,
    open_messages: BTreeSet<String>,
    closed_messages: HashSet<String>,
    open_tool_calls: BTreeSet<String>,
    closed_tool_calls: HashSet<String>,
}

impl Default for SpanVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanVerifier {
    pub fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
            open_messages: BTreeSet::new(),
            closed_messages: HashSet::new(),
            open_tool_calls: BTreeSet::new(),
            closed_tool_calls: HashSet::new(),
        }
    }

    /// Check a complete event sequence.
    pub fn verify_all<'a>(
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<(), ProtocolViolation> {
        let mut verifier = Self::new();
        for event in events {
            verifier.observe(event)?;
        }
        verifier.finish()
    }

    /// Returns true once a terminal event has been observed.
    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Ids of currently open message and tool-call spans.
    pub fn open_spans(&self) -> Vec<String> {
        self.open_messages
            .iter()
            .chain(self.open_tool_calls.iter())
            .cloned()
            .collect()
    }

    /// Check the next event of the run.
    pub fn observe(&mut self, event: &Event) -> Result<(), ProtocolViolation> {
        let event_type = event.event_type();

        if self.phase == Phase::Ended {
            return Err(ProtocolViolation::AfterTerminal(event_type));
        }
        if let EventKind::RunStarted { thread_id, run_id } = &event.kind {
            if self.phase != Phase::NotStarted {
                return Err(ProtocolViolation::DuplicateRunStarted);
            }
            self.phase = Phase::Running {
                thread_id: thread_id.clone(),
                run_id: run_id.clone(),
            };
            return Ok(());
        }
        if self.phase == Phase::NotStarted {
            return Err(ProtocolViolation::BeforeRunStarted(event_type));
        }

        match &event.kind {
            EventKind::RunStarted { .. } => {}
            EventKind::RunFinished { thread_id, run_id } => {
                self.check_run_ids(event_type, thread_id, run_id)?;
                let open = self.open_spans();
                if !open.is_empty() {
                    return Err(ProtocolViolation::OpenSpansAtFinish(open));
                }
                self.phase = Phase::Ended;
            }
            EventKind::RunError {
                thread_id, run_id, ..
            } => {
                // Spans may legitimately be left open by a failed run.
                self.check_run_ids(event_type, thread_id, run_id)?;
                self.phase = Phase::Ended;
            }
            EventKind::TextMessageStart { message_id, .. } => {
                if self.open_messages.contains(message_id) {
                    return Err(ProtocolViolation::MessageAlreadyOpen(message_id.clone()));
                }
                if self.closed_messages.contains(message_id) {
                    return Err(ProtocolViolation::MessageReused(message_id.clone()));
                }
                self.open_messages.insert(message_id.clone());
            }
            EventKind::TextMessageContent { message_id, .. } => {
                if !self.open_messages.contains(message_id) {
                    return Err(ProtocolViolation::MessageNotOpen(message_id.clone()));
                }
            }
            EventKind::TextMessageEnd { message_id } => {
                if !self.open_messages.remove(message_id) {
                    return Err(ProtocolViolation::MessageNotOpen(message_id.clone()));
                }
                self.closed_messages.insert(message_id.clone());
            }
            EventKind::ToolCallStart { tool_call_id, .. } => {
                if self.open_tool_calls.contains(tool_call_id) {
                    return Err(ProtocolViolation::ToolCallAlreadyOpen(tool_call_id.clone()));
                }
                if self.closed_tool_calls.contains(tool_call_id) {
                    return Err(ProtocolViolation::ToolCallReused(tool_call_id.clone()));
                }
                self.open_tool_calls.insert(tool_call_id.clone());
            }
            EventKind::ToolCallArgs { tool_call_id, .. } => {
                if !self.open_tool_calls.contains(tool_call_id) {
                    return Err(ProtocolViolation::ToolCallNotOpen(tool_call_id.clone()));
                }
            }
            EventKind::ToolCallEnd { tool_call_id } => {
                if !self.open_tool_calls.remove(tool_call_id) {
                    return Err(ProtocolViolation::ToolCallNotOpen(tool_call_id.clone()));
                }
                self.closed_tool_calls.insert(tool_call_id.clone());
            }
            EventKind::MessagesSnapshot { .. } => {}
        }

        Ok(())
    }

    /// Check that the run reached a terminal event.
    pub fn finish(&self) -> Result<(), ProtocolViolation> {
        if self.phase == Phase::Ended {
            Ok(())
        } else {
            Err(ProtocolViolation::MissingTerminal)
        }
    }

    fn check_run_ids(
        &self,
        event: EventType,
        thread_id: &str,
        run_id: &str,
    ) -> Result<(), ProtocolViolation> {
        if let Phase::Running {
            thread_id: expected_thread_id,
            run_id: expected_run_id,
        } = &self.phase
        {
            if thread_id != expected_thread_id || run_id != expected_run_id {
                return Err(ProtocolViolation::RunMismatch {
                    event,
                    thread_id: thread_id.to_string(),
                    run_id: run_id.to_string(),
                    expected_thread_id: expected_thread_id.clone(),
                    expected_run_id: expected_run_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
