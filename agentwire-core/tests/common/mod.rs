//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use agentwire_core::{
    passthrough, Agent, Event, EventStream, EventType, RunAgentInput, RunStream,
};
use futures::StreamExt;

/// An agent that replays a fixed list of protocol events.
pub struct ReplayAgent {
    events: Vec<Event>,
}

impl ReplayAgent {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl Agent for ReplayAgent {
    type Event = Event;

    fn run(&self, _input: RunAgentInput) -> RunStream<Event> {
        let events: Vec<_> = self.events.iter().cloned().map(Ok).collect();
        Box::pin(futures::stream::iter(events))
    }

    fn transform(&self, _input: &RunAgentInput, source: RunStream<Event>) -> EventStream {
        passthrough(source)
    }
}

pub async fn collect(mut stream: EventStream) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        events.push(item.expect("stream should not fail"));
    }
    events
}

pub fn types(events: &[Event]) -> Vec<EventType> {
    events.iter().map(Event::event_type).collect()
}
