//! End-to-end protocol properties: agents, the wire codec and history
//! reconstruction working together through the public API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agentwire_core::{
    DynAgent, EchoAgent, Event, EventDecoder, EventEncoder, EventType, HistoryBuilder, Message,
    ParrotAgent, Role, RunAgentInput, ScriptedChatAgent, SharedAgent, SpanVerifier, WireFormat,
};
use common::{collect, types, ReplayAgent};

fn agents() -> Vec<(&'static str, SharedAgent)> {
    vec![
        (
            "scripted",
            Arc::new(ScriptedChatAgent::new().with_delay(Duration::ZERO)) as SharedAgent,
        ),
        ("parrot", Arc::new(ParrotAgent::new()) as SharedAgent),
        ("echo", Arc::new(EchoAgent::new()) as SharedAgent),
    ]
}

fn input(content: &str) -> RunAgentInput {
    RunAgentInput::new("thread-1", "run-1").with_message(Message::user(content))
}

#[tokio::test]
async fn test_every_agent_respects_the_envelope() {
    for prompt in ["hello", "change_background", ""] {
        for (name, agent) in agents() {
            let events = collect(agent.run_agent(input(prompt))).await;

            let starts = events
                .iter()
                .filter(|e| e.event_type() == EventType::RunStarted)
                .count();
            let terminals = events.iter().filter(|e| e.is_terminal()).count();

            assert_eq!(starts, 1, "{} ({:?})", name, prompt);
            assert_eq!(terminals, 1, "{} ({:?})", name, prompt);
            assert_eq!(events[0].event_type(), EventType::RunStarted);
            assert!(events.last().unwrap().is_terminal());
            SpanVerifier::verify_all(&events).unwrap();
        }
    }
}

#[tokio::test]
async fn test_wire_round_trip_rebuilds_history() {
    let agent = ScriptedChatAgent::new().with_delay(Duration::ZERO);
    let events = collect(agent.run_agent(input("hello"))).await;

    for format in [WireFormat::Sse, WireFormat::Json] {
        let encoder = EventEncoder::new(format);
        let mut bytes = Vec::new();
        for event in &events {
            bytes.extend(encoder.encode(event).unwrap().into_bytes());
        }

        // Uneven chunking, as a network would deliver it.
        let mut decoder = EventDecoder::new(format);
        let mut received = Vec::new();
        for chunk in bytes.chunks(13) {
            received.extend(decoder.push(chunk).unwrap());
        }
        assert_eq!(received, events);

        let mut history = HistoryBuilder::with_messages(vec![Message::user("hello")]);
        history.apply_all(&received).unwrap();
        let messages = history.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role(), Role::Assistant);
        assert!(messages[1].content().unwrap().ends_with('✓'));
    }
}

#[tokio::test]
async fn test_snapshot_is_authoritative() {
    let agent = ReplayAgent::new(vec![
        Event::run_started("thread-1", "run-1"),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "draft"),
        Event::text_message_end("m1"),
        Event::messages_snapshot(vec![
            Message::user("hello"),
            Message::assistant("final").with_id("m1"),
        ]),
        Event::run_finished("thread-1", "run-1"),
    ]);

    let events = collect(agent.run_agent(input("hello"))).await;
    let mut history = HistoryBuilder::new();
    history.apply_all(&events).unwrap();

    assert_eq!(history.messages().len(), 2);
    assert_eq!(history.messages()[1].content(), Some("final"));
}

#[tokio::test]
async fn test_custom_agent_without_terminal_gets_run_error() {
    let agent = ReplayAgent::new(vec![
        Event::run_started("thread-1", "run-1"),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "cut off"),
    ]);

    let events = collect(agent.run_agent(input("hello"))).await;
    assert_eq!(
        types(&events),
        vec![
            EventType::RunStarted,
            EventType::TextMessageStart,
            EventType::TextMessageContent,
            EventType::RunError,
        ]
    );
}

#[tokio::test]
async fn test_span_balance_per_id() {
    for (name, agent) in agents() {
        let events = collect(agent.run_agent(input("hello"))).await;

        let mut history = HistoryBuilder::new();
        history.apply_all(&events).unwrap();
        assert!(!history.has_open_spans(), "{} left spans open", name);
    }
}
