//! Tests for run ordering and span balance checks.

use super::*;
use crate::input::Role;

fn start() -> Event {
    Event::run_started("t1", "r1")
}

fn finish() -> Event {
    Event::run_finished("t1", "r1")
}

#[test]
fn test_minimal_run_is_valid() {
    assert_eq!(SpanVerifier::verify_all(&[start(), finish()]), Ok(()));
}

#[test]
fn test_interleaved_spans_are_valid() {
    let events = vec![
        start(),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "a"),
        Event::tool_call_start("tc1", "search", Some("m1".to_string())),
        Event::text_message_content("m1", "b"),
        Event::tool_call_args("tc1", "{}"),
        Event::text_message_end("m1"),
        Event::tool_call_end("tc1"),
        Event::messages_snapshot(vec![]),
        finish(),
    ];
    assert_eq!(SpanVerifier::verify_all(&events), Ok(()));
}

#[test]
fn test_event_before_run_started() {
    let events = vec![Event::text_message_start("m1", Role::Assistant), start()];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::BeforeRunStarted(EventType::TextMessageStart))
    );
}

#[test]
fn test_duplicate_run_started() {
    assert_eq!(
        SpanVerifier::verify_all(&[start(), start(), finish()]),
        Err(ProtocolViolation::DuplicateRunStarted)
    );
}

#[test]
fn test_event_after_terminal() {
    let events = vec![start(), finish(), Event::text_message_end("m1")];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::AfterTerminal(EventType::TextMessageEnd))
    );
}

#[test]
fn test_second_terminal_is_rejected() {
    let events = vec![start(), finish(), Event::run_error("t1", "r1", "late")];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::AfterTerminal(EventType::RunError))
    );
}

#[test]
fn test_missing_terminal() {
    let events = vec![start(), Event::messages_snapshot(vec![])];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::MissingTerminal)
    );
}

#[test]
fn test_empty_sequence_is_missing_terminal() {
    assert_eq!(
        SpanVerifier::verify_all(&Vec::<Event>::new()),
        Err(ProtocolViolation::MissingTerminal)
    );
}

#[test]
fn test_finish_with_open_message() {
    let events = vec![
        start(),
        Event::text_message_start("m1", Role::Assistant),
        Event::tool_call_start("tc1", "search", None),
        finish(),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::OpenSpansAtFinish(vec![
            "m1".to_string(),
            "tc1".to_string()
        ]))
    );
}

#[test]
fn test_error_may_leave_spans_open() {
    let events = vec![
        start(),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_content("m1", "partial"),
        Event::run_error("t1", "r1", "backend failed"),
    ];
    assert_eq!(SpanVerifier::verify_all(&events), Ok(()));
}

#[test]
fn test_content_without_start() {
    let events = vec![start(), Event::text_message_content("m1", "x")];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::MessageNotOpen("m1".to_string()))
    );
}

#[test]
fn test_reopening_open_message() {
    let events = vec![
        start(),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_start("m1", Role::Assistant),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::MessageAlreadyOpen("m1".to_string()))
    );
}

#[test]
fn test_reusing_closed_message_id() {
    let events = vec![
        start(),
        Event::text_message_start("m1", Role::Assistant),
        Event::text_message_end("m1"),
        Event::text_message_start("m1", Role::Assistant),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::MessageReused("m1".to_string()))
    );
}

#[test]
fn test_tool_call_violations() {
    let args_without_start = vec![start(), Event::tool_call_args("tc1", "{}")];
    assert_eq!(
        SpanVerifier::verify_all(&args_without_start),
        Err(ProtocolViolation::ToolCallNotOpen("tc1".to_string()))
    );

    let double_end = vec![
        start(),
        Event::tool_call_start("tc1", "search", None),
        Event::tool_call_end("tc1"),
        Event::tool_call_end("tc1"),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&double_end),
        Err(ProtocolViolation::ToolCallNotOpen("tc1".to_string()))
    );

    let reused = vec![
        start(),
        Event::tool_call_start("tc1", "search", None),
        Event::tool_call_end("tc1"),
        Event::tool_call_start("tc1", "search", None),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&reused),
        Err(ProtocolViolation::ToolCallReused("tc1".to_string()))
    );

    let reopened = vec![
        start(),
        Event::tool_call_start("tc1", "search", None),
        Event::tool_call_start("tc1", "search", None),
    ];
    assert_eq!(
        SpanVerifier::verify_all(&reopened),
        Err(ProtocolViolation::ToolCallAlreadyOpen("tc1".to_string()))
    );
}

#[test]
fn test_terminal_with_other_run_ids() {
    let events = vec![start(), Event::run_finished("t1", "other")];
    assert!(matches!(
        SpanVerifier::verify_all(&events),
        Err(ProtocolViolation::RunMismatch { ref run_id, .. }) if run_id == "other"
    ));
}

#[test]
fn test_incremental_observe() {
    let mut verifier = SpanVerifier::new();
    verifier.observe(&start()).unwrap();
    verifier
        .observe(&Event::text_message_start("m1", Role::Assistant))
        .unwrap();
    assert_eq!(verifier.open_spans(), vec!["m1".to_string()]);
    assert!(!verifier.is_ended());

    verifier.observe(&Event::text_message_end("m1")).unwrap();
    verifier.observe(&finish()).unwrap();
    assert!(verifier.is_ended());
    assert!(verifier.open_spans().is_empty());
    assert_eq!(verifier.finish(), Ok(()));
}
