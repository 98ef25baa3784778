//! Test utilities for agentwire-core.
//!
//! Mock backends and stream helpers for testing agents without a real
//! backend. Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! agentwire-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agentwire_core::{DelegatingAgent, DynAgent};
//! use agentwire_core::test_utils::{collect_events, test_input, ScriptedBackend};
//!
//! let backend = ScriptedBackend::new().with_text("Hello!").with_finish();
//! let agent = DelegatingAgent::new(Arc::new(backend), "assistant");
//!
//! let events = collect_events(agent.run_agent(test_input("Hi"))).await?;
//! assert!(events.last().unwrap().is_terminal());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::agent::EventStream;
use crate::backend::{AgentBackend, BackendError, BackendPart, BackendRequest, BackendStream};
use crate::error::AgentError;
use crate::events::{Event, EventType};
use crate::input::{Message, RunAgentInput};

/// A backend that replays a fixed list of parts.
///
/// After the parts it can fail, hang forever, or simply end. Every request is
/// recorded, and a flag is raised when a returned stream is dropped or runs
/// to completion.
///
/// ```ignore
/// let backend = ScriptedBackend::new()
///     .with_text("Checking")
///     .with_tool_call("tc1", "weather", json!({"city": "Oslo"}))
///     .with_finish();
/// ```
#[derive(Clone)]
pub struct ScriptedBackend {
    parts: Vec<BackendPart>,
    failure: Option<BackendError>,
    connect_failure: Option<BackendError>,
    hang: bool,
    released: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<BackendRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            failure: None,
            connect_failure: None,
            hang: false,
            released: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_part(mut self, part: BackendPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_part(BackendPart::Text(text.into()))
    }

    pub fn with_tool_call(
        self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        self.with_part(BackendPart::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        })
    }

    pub fn with_finish(self) -> Self {
        self.with_part(BackendPart::Finish {
            reason: Some("stop".to_string()),
        })
    }

    /// Fail the stream with `error` after the scripted parts.
    pub fn failing_with(mut self, error: BackendError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail `stream` itself, before any part.
    pub fn failing_to_connect(mut self, error: BackendError) -> Self {
        self.connect_failure = Some(error);
        self
    }

    /// Never end the stream after the scripted parts.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Returns true once a stream from this backend was dropped or ended.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn stream(&self, request: BackendRequest) -> Result<BackendStream, BackendError> {
        self.requests.lock().unwrap().push(request);

        if let Some(error) = &self.connect_failure {
            return Err(error.clone());
        }

        let parts = self.parts.clone();
        let failure = self.failure.clone();
        let hang = self.hang;
        let flag = ReleaseFlag(Arc::clone(&self.released));

        Ok(Box::pin(async_stream::stream! {
            let _flag = flag;
            for part in parts {
                yield Ok::<BackendPart, BackendError>(part);
            }
            if let Some(error) = failure {
                yield Err(error);
                return;
            }
            if hang {
                futures::future::pending::<()>().await;
            }
        }))
    }
}

/// Drain an event stream, failing on the first stream error.
pub async fn collect_events(mut stream: EventStream) -> Result<Vec<Event>, AgentError> {
    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        events.push(item?);
    }
    Ok(events)
}

/// The type of every event, in order.
pub fn event_types(events: &[Event]) -> Vec<EventType> {
    events.iter().map(Event::event_type).collect()
}

/// An input with one user message.
pub fn test_input(content: &str) -> RunAgentInput {
    RunAgentInput::new("thread-1", "run-1").with_message(Message::user(content))
}
