//! An agent that forwards runs to a remote [`AgentBackend`].

use std::sync::Arc;

use futures::StreamExt;

use crate::agent::{passthrough, Agent, EventStream, RunStream};
use crate::backend::{convert_messages, AgentBackend, BackendPart, BackendRequest};
use crate::error::AgentError;
use crate::events::Event;
use crate::input::{RunAgentInput, Role};

/// Translates backend parts into protocol events for one run.
///
/// Text parts share one assistant message, opened by the first non-empty
/// text part. Tool calls are emitted as complete `START`/`ARGS`/`END` spans
/// whose parent is the open message, if any.
#[derive(Debug, Clone)]
pub struct PartTranslator {
    thread_id: String,
    run_id: String,
    current_message: Option<String>,
    finished: bool,
}

impl PartTranslator {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            current_message: None,
            finished: false,
        }
    }

    /// Returns true once [`finish`](Self::finish) has produced `RUN_FINISHED`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Translate one part. Parts after the finish are ignored.
    pub fn translate(&mut self, part: BackendPart) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }

        match part {
            BackendPart::Text(text) => {
                if text.is_empty() {
                    return Vec::new();
                }
                let mut events = Vec::with_capacity(2);
                let message_id = match &self.current_message {
                    Some(id) => id.clone(),
                    None => {
                        let id = uuid::Uuid::new_v4().to_string();
                        events.push(Event::text_message_start(&id, Role::Assistant));
                        self.current_message = Some(id.clone());
                        id
                    }
                };
                events.push(Event::text_message_content(message_id, text));
                events
            }
            BackendPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => vec![
                Event::tool_call_start(&tool_call_id, tool_name, self.current_message.clone()),
                Event::tool_call_args(&tool_call_id, args.to_string()),
                Event::tool_call_end(tool_call_id),
            ],
            BackendPart::Finish { reason } => {
                log::debug!(
                    "backend finished run {} (reason: {})",
                    self.run_id,
                    reason.as_deref().unwrap_or("none")
                );
                self.finish()
            }
            BackendPart::ToolCallStreamingStart { tool_call_id, .. }
            | BackendPart::ToolCallDelta { tool_call_id, .. }
            | BackendPart::ToolResult { tool_call_id, .. } => {
                log::debug!("ignoring backend bookkeeping part for tool call {}", tool_call_id);
                Vec::new()
            }
        }
    }

    /// Close the open message, if any, and finish the run.
    pub fn finish(&mut self) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = Vec::with_capacity(2);
        if let Some(message_id) = self.current_message.take() {
            events.push(Event::text_message_end(message_id));
        }
        events.push(Event::run_finished(&self.thread_id, &self.run_id));
        events
    }
}

/// Delegates each run to a named agent on an [`AgentBackend`].
///
/// `RUN_STARTED` is emitted before the backend is contacted, so connection
/// failures surface as `RUN_ERROR`. A backend stream that ends without a
/// finish part is treated as finished.
#[derive(Clone)]
pub struct DelegatingAgent {
    backend: Arc<dyn AgentBackend>,
    agent_id: String,
    description: String,
}

impl DelegatingAgent {
    pub fn new(backend: Arc<dyn AgentBackend>, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self {
            backend,
            description: format!("Delegates to backend agent '{}'", agent_id),
            agent_id,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

impl std::fmt::Debug for DelegatingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatingAgent")
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

impl Agent for DelegatingAgent {
    type Event = Event;

    fn description(&self) -> &str {
        &self.description
    }

    fn run(&self, input: RunAgentInput) -> RunStream<Event> {
        let backend = Arc::clone(&self.backend);
        let agent_id = self.agent_id.clone();

        Box::pin(async_stream::stream! {
            yield Ok::<Event, AgentError>(Event::run_started(&input.thread_id, &input.run_id));

            let request = BackendRequest {
                agent_id,
                thread_id: input.thread_id.clone(),
                run_id: input.run_id.clone(),
                messages: convert_messages(&input.messages),
            };
            let mut parts = match backend.stream(request).await {
                Ok(parts) => parts,
                Err(err) => {
                    yield Err(AgentError::from(err));
                    return;
                }
            };

            let mut translator = PartTranslator::new(&input.thread_id, &input.run_id);
            while let Some(part) = parts.next().await {
                match part {
                    Ok(part) => {
                        for event in translator.translate(part) {
                            yield Ok(event);
                        }
                        if translator.is_finished() {
                            return;
                        }
                    }
                    Err(err) => {
                        yield Err(AgentError::from(err));
                        return;
                    }
                }
            }

            log::debug!("backend stream for run {} ended without a finish part", input.run_id);
            for event in translator.finish() {
                yield Ok(event);
            }
        })
    }

    fn transform(&self, _input: &RunAgentInput, source: RunStream<Event>) -> EventStream {
        passthrough(source)
    }
}
