//! # agentwire
//!
//! An event protocol for streaming agent runs.
//!
//! A run is a strictly ordered sequence of typed [`Event`]s: one
//! `RUN_STARTED`, any number of text-message and tool-call spans, and exactly
//! one terminal `RUN_FINISHED` or `RUN_ERROR`. The same sequence can be
//! consumed in-process as a stream or carried over HTTP as Server-Sent Events
//! or newline-delimited JSON.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use agentwire_core::{DynAgent, Message, RunAgentInput, ScriptedChatAgent};
//! use futures::StreamExt;
//!
//! # tokio_test::block_on(async {
//! let agent = ScriptedChatAgent::new().with_delay(Duration::ZERO);
//! let input = RunAgentInput::new("thread-1", "run-1").with_message(Message::user("hi"));
//!
//! let mut events = agent.run_agent(input);
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event.unwrap().event_type());
//! }
//! # });
//! ```
//!
//! ## Writing Agents
//!
//! Implement [`Agent`]: `run` yields the agent's own events and `transform`
//! maps them onto the protocol. See [`EchoAgent`] for the smallest example.
//! Every run goes through a [`RunGuard`], so a failing agent still ends its
//! run with `RUN_ERROR`.
//!
//! ## Wire Format
//!
//! [`EventEncoder`] and [`EventDecoder`] convert events to and from SSE or
//! NDJSON frames. [`HistoryBuilder`] rebuilds the conversation from a
//! received event sequence.

pub mod agent;
pub mod agents;
pub mod backend;
pub mod encoding;
pub mod error;
pub mod events;
pub mod history;
pub mod input;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use agent::{box_agent, passthrough, Agent, DynAgent, EventStream, RunGuard, RunStream, SharedAgent};
pub use agents::{
    DelegatingAgent, EchoAgent, EchoEvent, ParrotAgent, ParrotEvent, PartTranslator,
    ScriptedChatAgent, BACKGROUND_GRADIENT, CHANGE_BACKGROUND,
};
pub use backend::{
    convert_messages, AgentBackend, BackendError, BackendMessage, BackendPart, BackendRequest,
    BackendStream,
};
pub use encoding::{
    decode_stream, DecodeError, EncodeError, EventDecoder, EventEncoder, WireFormat,
    DEFAULT_MAX_FRAME_LEN, JSON_CONTENT_TYPE, SSE_CONTENT_TYPE,
};
pub use error::{AgentError, Result};
pub use events::{Event, EventKind, EventType};
pub use history::HistoryBuilder;
pub use input::{FunctionCall, InputError, Message, Role, RunAgentInput, Tool, ToolCall};
pub use verify::{ProtocolViolation, SpanVerifier};
