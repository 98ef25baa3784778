//! Tests for the run pipeline and the reference scenarios.

use super::*;
use crate::agents::{DelegatingAgent, EchoAgent, ScriptedChatAgent, CHANGE_BACKGROUND};
use crate::backend::BackendError;
use crate::history::HistoryBuilder;
use crate::input::{Message, Role};
use crate::test_utils::{collect_events, event_types, test_input, ScriptedBackend};
use crate::verify::SpanVerifier;
use futures::stream;
use serde_json::json;
use std::time::Duration;

fn guarded(items: Vec<Result<Event, AgentError>>) -> EventStream {
    let input = RunAgentInput::new("t1", "r1");
    RunGuard::new(&input).guard(Box::pin(stream::iter(items)))
}

async fn drain(mut stream: EventStream) -> Vec<Result<Event, AgentError>> {
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    items
}

// ===== RunGuard =====

#[tokio::test]
async fn test_guard_forwards_complete_run() {
    let events = collect_events(guarded(vec![
        Ok(Event::run_started("t1", "r1")),
        Ok(Event::run_finished("t1", "r1")),
    ]))
    .await
    .unwrap();

    assert_eq!(
        event_types(&events),
        vec![EventType::RunStarted, EventType::RunFinished]
    );
}

#[tokio::test]
async fn test_guard_error_before_start_is_stream_error() {
    let items = drain(guarded(vec![Err(AgentError::Other("no backend".into()))])).await;

    assert_eq!(items.len(), 1);
    assert!(matches!(&items[0], Err(AgentError::Other(msg)) if msg == "no backend"));
}

#[tokio::test]
async fn test_guard_error_after_start_becomes_run_error() {
    let events = collect_events(guarded(vec![
        Ok(Event::run_started("t1", "r1")),
        Ok(Event::text_message_start("m1", Role::Assistant)),
        Err(AgentError::Transport("reset".into())),
        Ok(Event::text_message_end("m1")),
    ]))
    .await
    .unwrap();

    assert_eq!(events.len(), 3);
    match &events[2].kind {
        EventKind::RunError {
            thread_id,
            run_id,
            message,
            code,
        } => {
            assert_eq!(thread_id, "t1");
            assert_eq!(run_id, "r1");
            assert!(message.contains("reset"));
            assert_eq!(code.as_deref(), Some("transport_error"));
        }
        other => panic!("expected RUN_ERROR, got {:?}", other),
    }
}

#[tokio::test]
async fn test_guard_appends_run_error_when_source_stops() {
    let events = collect_events(guarded(vec![Ok(Event::run_started("t1", "r1"))]))
        .await
        .unwrap();

    assert_eq!(
        event_types(&events),
        vec![EventType::RunStarted, EventType::RunError]
    );
    SpanVerifier::verify_all(&events).unwrap();
}

#[tokio::test]
async fn test_guard_empty_source_is_empty_run() {
    let items = drain(guarded(vec![])).await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(AgentError::EmptyRun)));
}

#[tokio::test]
async fn test_guard_stops_after_terminal() {
    let events = collect_events(guarded(vec![
        Ok(Event::run_started("t1", "r1")),
        Ok(Event::run_finished("t1", "r1")),
        Ok(Event::text_message_start("late", Role::Assistant)),
        Err(AgentError::Other("late failure".into())),
    ]))
    .await
    .unwrap();

    assert_eq!(events.len(), 2);
    assert!(events[1].is_terminal());
}

#[tokio::test]
async fn test_guard_drops_source_after_terminal() {
    let backend = ScriptedBackend::new()
        .with_text("hi")
        .with_finish()
        .with_text("ignored")
        .hanging();
    let agent = DelegatingAgent::new(Arc::new(backend.clone()), "assistant");

    let events = collect_events(agent.run_agent(test_input("hello")))
        .await
        .unwrap();

    assert_eq!(events.last().unwrap().event_type(), EventType::RunFinished);
    assert!(backend.released());
}

// ===== DynAgent =====

#[tokio::test]
async fn test_box_agent_and_shared_agent() {
    let boxed = box_agent(EchoAgent::new());
    assert_eq!(boxed.description(), "Echoes the last user message");

    let shared: SharedAgent = Arc::new(ScriptedChatAgent::new().with_delay(Duration::ZERO));
    let events = collect_events(shared.run_agent(test_input("x"))).await.unwrap();
    SpanVerifier::verify_all(&events).unwrap();
}

#[tokio::test]
async fn test_run_is_cold_until_polled() {
    let backend = ScriptedBackend::new().with_finish();
    let agent = DelegatingAgent::new(Arc::new(backend.clone()), "assistant");

    let stream = agent.run_agent(test_input("hello"));
    assert!(backend.requests().is_empty());
    drop(stream);
    assert!(backend.requests().is_empty());
}

// ===== Scenario A: scripted text message =====

#[tokio::test]
async fn test_scenario_scripted_text() {
    let agent = ScriptedChatAgent::new().with_delay(Duration::ZERO);
    let input = RunAgentInput::new("thread-a", "run-a").with_message(Message::user("hello"));

    let events = collect_events(agent.run_agent(input)).await.unwrap();
    SpanVerifier::verify_all(&events).unwrap();

    assert_eq!(events.first().unwrap().event_type(), EventType::RunStarted);
    assert_eq!(events.last().unwrap().event_type(), EventType::RunFinished);

    let mut history = HistoryBuilder::new();
    history.apply_all(&events).unwrap();
    assert_eq!(
        history.messages()[0].content(),
        Some("Mastra integration in: 10  9  8  7  6  5  4  3  2  1  ✓")
    );
}

// ===== Scenario B: change_background tool call =====

#[tokio::test]
async fn test_scenario_change_background() {
    let agent = ScriptedChatAgent::new().with_delay(Duration::ZERO);
    let events = collect_events(agent.run_agent(test_input(CHANGE_BACKGROUND)))
        .await
        .unwrap();
    SpanVerifier::verify_all(&events).unwrap();

    let mut history = HistoryBuilder::new();
    history.apply_all(&events).unwrap();

    let calls = history.messages()[0].tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "change_background");
    assert_eq!(
        calls[0].parsed_arguments().unwrap(),
        json!({"background": "linear-gradient(135deg, #667eea 0%, #764ba2 100%)"})
    );
}

// ===== Scenario C: backend fails after one delta =====

#[tokio::test]
async fn test_scenario_backend_failure_after_delta() {
    let backend = ScriptedBackend::new()
        .with_text("Hel")
        .failing_with(BackendError::Stream("model overloaded".into()));
    let agent = DelegatingAgent::new(Arc::new(backend), "assistant");

    let events = collect_events(agent.run_agent(test_input("hello")))
        .await
        .unwrap();

    assert_eq!(
        event_types(&events),
        vec![
            EventType::RunStarted,
            EventType::TextMessageStart,
            EventType::TextMessageContent,
            EventType::RunError,
        ]
    );
    SpanVerifier::verify_all(&events).unwrap();
    match &events[3].kind {
        EventKind::RunError { message, code, .. } => {
            assert!(message.contains("model overloaded"));
            assert_eq!(code.as_deref(), Some("backend_error"));
        }
        other => panic!("expected RUN_ERROR, got {:?}", other),
    }
}

#[tokio::test]
async fn test_backend_connect_failure_is_run_error() {
    let backend = ScriptedBackend::new()
        .failing_to_connect(BackendError::Connection("refused".into()));
    let agent = DelegatingAgent::new(Arc::new(backend), "assistant");

    let events = collect_events(agent.run_agent(test_input("hello")))
        .await
        .unwrap();

    assert_eq!(
        event_types(&events),
        vec![EventType::RunStarted, EventType::RunError]
    );
}

// ===== Scenario D: cancellation =====

#[tokio::test]
async fn test_scenario_cancellation_releases_backend() {
    let backend = ScriptedBackend::new().with_text("partial").hanging();
    let agent = DelegatingAgent::new(Arc::new(backend.clone()), "assistant");

    let mut stream = agent.run_agent(test_input("hello"));
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(stream.next().await.unwrap().unwrap());
    }
    assert_eq!(
        event_types(&seen),
        vec![
            EventType::RunStarted,
            EventType::TextMessageStart,
            EventType::TextMessageContent,
        ]
    );

    let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(pending.is_err(), "backend should still be streaming");
    assert!(!backend.released());

    drop(stream);
    assert!(backend.released());
}

#[tokio::test]
async fn test_scripted_agent_cancel_mid_countdown() {
    let agent = ScriptedChatAgent::new().with_delay(Duration::from_secs(60));
    let mut stream = agent.run_agent(test_input("hello"));

    // start, message start, intro, first step
    for _ in 0..4 {
        stream.next().await.unwrap().unwrap();
    }
    let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(pending.is_err());
    drop(stream);
}

// ===== Delegation details =====

#[tokio::test]
async fn test_delegating_request_and_tool_call() {
    let backend = ScriptedBackend::new()
        .with_text("Let me check")
        .with_tool_call("tc1", "weather", json!({"city": "Oslo"}))
        .with_finish();
    let agent = DelegatingAgent::new(Arc::new(backend.clone()), "weatherAgent");

    let input = RunAgentInput::new("t9", "r9")
        .with_message(Message::system("be brief"))
        .with_message(Message::user("weather?"));
    let events = collect_events(agent.run_agent(input)).await.unwrap();
    SpanVerifier::verify_all(&events).unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].agent_id, "weatherAgent");
    assert_eq!(requests[0].thread_id, "t9");
    assert_eq!(requests[0].messages.len(), 1);

    let mut history = HistoryBuilder::new();
    history.apply_all(&events).unwrap();
    let messages = history.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content(), Some("Let me check"));
    assert_eq!(messages[0].tool_calls()[0].function.name, "weather");
}

#[tokio::test]
async fn test_backend_end_without_finish_is_finish() {
    let backend = ScriptedBackend::new().with_text("done");
    let agent = DelegatingAgent::new(Arc::new(backend), "assistant");

    let events = collect_events(agent.run_agent(test_input("hello")))
        .await
        .unwrap();

    assert_eq!(
        event_types(&events),
        vec![
            EventType::RunStarted,
            EventType::TextMessageStart,
            EventType::TextMessageContent,
            EventType::TextMessageEnd,
            EventType::RunFinished,
        ]
    );
}
