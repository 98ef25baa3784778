//! The agent abstraction and the per-run pipeline.
//!
//! An agent runs in two stages:
//!
//! 1. [`Agent::run`] produces a cold stream of the agent's own events. Nothing
//!    happens until the stream is polled, so the caller decides when a run
//!    actually starts and can drop it before any side effect.
//! 2. [`Agent::transform`] rewrites that stream into protocol [`Event`]s.
//!    Agents whose `run` already yields protocol events use [`passthrough`].
//!
//! [`DynAgent::run_agent`] composes both stages and wraps the result in a
//! [`RunGuard`], which enforces the run envelope for every agent regardless
//! of backend.
//!
//! # Example
//!
//! ```rust
//! use agentwire_core::{passthrough, Agent, Event, EventStream, RunAgentInput, RunStream};
//!
//! struct Hello;
//!
//! impl Agent for Hello {
//!     type Event = Event;
//!
//!     fn run(&self, input: RunAgentInput) -> RunStream<Event> {
//!         let events = vec![
//!             Ok(Event::run_started(&input.thread_id, &input.run_id)),
//!             Ok(Event::run_finished(&input.thread_id, &input.run_id)),
//!         ];
//!         Box::pin(futures::stream::iter(events))
//!     }
//!
//!     fn transform(&self, _input: &RunAgentInput, source: RunStream<Event>) -> EventStream {
//!         passthrough(source)
//!     }
//! }
//! ```

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::AgentError;
use crate::events::{Event, EventKind, EventType};
use crate::input::RunAgentInput;
use crate::verify::SpanVerifier;

/// A cold, single-subscriber stream of an agent's own events.
pub type RunStream<T> = BoxStream<'static, Result<T, AgentError>>;

/// A stream of protocol events.
pub type EventStream = RunStream<Event>;

/// An agent that can execute runs.
///
/// `run` must not start any work before its stream is polled. Both stages
/// receive the same input; neither may assume object identity of it.
pub trait Agent: Send + Sync {
    /// The event type produced by `run`.
    ///
    /// Use [`Event`] when the agent emits protocol events directly.
    type Event: Send + 'static;

    /// Short human readable description, shown by agent listings.
    fn description(&self) -> &str {
        ""
    }

    /// Produce the raw event stream for one run.
    fn run(&self, input: RunAgentInput) -> RunStream<Self::Event>;

    /// Rewrite the raw stream into protocol events.
    ///
    /// Every raw event must map to one or more protocol events, or the
    /// returned stream must fail with [`AgentError::Transform`].
    fn transform(&self, input: &RunAgentInput, source: RunStream<Self::Event>) -> EventStream;
}

/// Identity transform for agents whose `run` yields protocol events.
pub fn passthrough(source: EventStream) -> EventStream {
    source
}

/// Object-safe view of an [`Agent`].
///
/// Implemented for every `Agent`, so heterogeneous agents can be stored
/// side by side in a registry.
pub trait DynAgent: Send + Sync {
    fn description(&self) -> &str;

    /// Run the full `run → transform → guard` pipeline.
    fn run_agent(&self, input: RunAgentInput) -> EventStream;
}

impl<A: Agent> DynAgent for A {
    fn description(&self) -> &str {
        Agent::description(self)
    }

    fn run_agent(&self, input: RunAgentInput) -> EventStream {
        let guard = RunGuard::new(&input);
        let source = self.run(input.clone());
        guard.guard(self.transform(&input, source))
    }
}

/// Shared handle to a type-erased agent.
pub type SharedAgent = Arc<dyn DynAgent>;

/// Convert an `Agent` into a type-erased `Box<dyn DynAgent>`.
pub fn box_agent<A: Agent + 'static>(agent: A) -> Box<dyn DynAgent> {
    Box::new(agent)
}

/// Enforces the run envelope on a protocol event stream.
///
/// - an error before `RUN_STARTED` is passed through and ends the stream
///   with no events;
/// - an error after `RUN_STARTED` becomes a `RUN_ERROR` event;
/// - a stream that stops after `RUN_STARTED` without a terminal event gets
///   a `RUN_ERROR` appended;
/// - a stream that stops before `RUN_STARTED` fails with
///   [`AgentError::EmptyRun`];
/// - nothing is forwarded after a terminal event.
///
/// Span ordering is checked with a [`SpanVerifier`]. Violations are logged
/// and trip a debug assertion; they never change what is forwarded.
/// Agents that relay events from a remote producer check them in
/// `transform` and fail with [`AgentError::Protocol`] instead.
pub struct RunGuard {
    thread_id: String,
    run_id: String,
    verifier: SpanVerifier,
    started: bool,
}

impl RunGuard {
    pub fn new(input: &RunAgentInput) -> Self {
        Self {
            thread_id: input.thread_id.clone(),
            run_id: input.run_id.clone(),
            verifier: SpanVerifier::new(),
            started: false,
        }
    }

    /// Wrap `source`, returning the guarded stream.
    pub fn guard(mut self, mut source: EventStream) -> EventStream {
        Box::pin(async_stream::stream! {
            while let Some(item) = source.next().await {
                match item {
                    Ok(event) => {
                        self.check(&event);
                        if event.event_type() == EventType::RunStarted {
                            self.started = true;
                        }
                        let terminal = event.is_terminal();
                        yield Ok::<Event, AgentError>(event);
                        if terminal {
                            return;
                        }
                    }
                    Err(err) => {
                        if self.started {
                            log::warn!(
                                "run {} failed after start: {}",
                                self.run_id,
                                err
                            );
                            yield Ok(self.run_error(&err.to_string(), err.code()));
                        } else {
                            yield Err(err);
                        }
                        return;
                    }
                }
            }

            if self.started {
                log::warn!("run {} ended without a terminal event", self.run_id);
                yield Ok(self.run_error("agent stream ended without RUN_FINISHED", None));
            } else {
                yield Err(AgentError::EmptyRun);
            }
        })
    }

    fn check(&mut self, event: &Event) {
        if let Err(violation) = self.verifier.observe(event) {
            log::warn!("run {}: protocol violation: {}", self.run_id, violation);
            debug_assert!(false, "protocol violation: {}", violation);
        }
    }

    fn run_error(&self, message: &str, code: Option<&str>) -> Event {
        Event::new(EventKind::RunError {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            message: message.to_string(),
            code: code.map(str::to_string),
        })
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
