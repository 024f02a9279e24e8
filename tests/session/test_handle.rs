//! Unit tests for `SessionHandle`
//!
//! Tests generation guarding and change notification

use serde_json::json;
use text2sql_agent::message::parse_event;
use text2sql_agent::{AgentEvent, Applied, QueryDefaults, SessionHandle, SessionStatus};

fn ev(value: serde_json::Value) -> AgentEvent {
    parse_event(value).unwrap()
}

#[test]
fn test_stale_generation_rejected() {
    let handle = SessionHandle::new();
    let first = handle.begin("first");
    let second = handle.begin("second");
    assert_ne!(first, second);

    let late = ev(json!({"event": "completed", "response": {"final_sql": "SELECT 1"}}));
    assert_eq!(handle.apply(first, late), Applied::Stale);
    assert_eq!(handle.status(), SessionStatus::Running);
    assert_eq!(handle.snapshot().question, "second");
}

#[test]
fn test_cancel_moves_generation_on() {
    let handle = SessionHandle::new();
    let generation = handle.begin("q");

    assert_eq!(handle.cancel(), Applied::Changed);
    assert_ne!(handle.generation(), generation);

    let event = ev(json!({"event": "section_delta", "iteration": 1, "section": "reasoning", "delta": "x"}));
    assert_eq!(handle.apply(generation, event), Applied::Stale);
    assert_eq!(handle.status(), SessionStatus::Cancelled);
    assert!(handle.snapshot().live_by_iteration.is_empty());
}

#[test]
fn test_stream_closed_while_running_is_error() {
    let handle = SessionHandle::new();
    let generation = handle.begin("q");
    assert_eq!(handle.stream_closed(generation), Applied::Changed);
    assert_eq!(handle.status(), SessionStatus::Error);
    assert!(handle.snapshot().error.is_some());

    // A stream closing after a terminal event changes nothing
    let generation = handle.begin("q2");
    handle.apply(generation, ev(json!({"event": "completed"})));
    assert_eq!(handle.stream_closed(generation), Applied::Ignored);
    assert_eq!(handle.status(), SessionStatus::Completed);
}

#[test]
fn test_submit_answer_builds_resume_request() {
    let handle = SessionHandle::new();
    let generation = handle.begin("Revenue by region");
    handle.apply(
        generation,
        ev(json!({
            "event": "needs_user_input",
            "response": {"question_to_user": "Fiscal or calendar year?"},
            "state": {"id": "s-9"}
        })),
    );

    let defaults = QueryDefaults {
        dbms: Some("postgresql".to_string()),
        ..QueryDefaults::default()
    };
    let (resumed, request) = handle.submit_answer("fiscal", defaults).unwrap();

    assert!(resumed > generation);
    assert_eq!(request.question, "Revenue by region");
    assert_eq!(request.user_response.as_deref(), Some("fiscal"));
    assert_eq!(request.session_state.unwrap().as_value(), &json!({"id": "s-9"}));
    assert_eq!(request.defaults.dbms.as_deref(), Some("postgresql"));

    // Events from the paused stream are stale now
    assert_eq!(
        handle.apply(generation, ev(json!({"event": "error", "message": "x"}))),
        Applied::Stale
    );
}

#[test]
fn test_submit_answer_requires_pause() {
    let handle = SessionHandle::new();
    handle.begin("q");
    assert!(handle.submit_answer("x", QueryDefaults::default()).is_err());
}

#[tokio::test]
async fn test_watcher_sees_changes() {
    let handle = SessionHandle::new();
    let mut watcher = handle.subscribe();
    let start = watcher.revision();

    let generation = handle.begin("q");
    assert!(watcher.changed().await);
    assert!(watcher.revision() > start);
    assert_eq!(watcher.snapshot().unwrap().status, SessionStatus::Running);

    handle.apply(
        generation,
        ev(json!({"event": "error", "message": "boom"})),
    );
    assert!(watcher.changed().await);
    assert_eq!(
        watcher.snapshot().unwrap().error.as_deref(),
        Some("boom")
    );
}

#[tokio::test]
async fn test_watcher_ends_when_handle_dropped() {
    let handle = SessionHandle::new();
    let mut watcher = handle.subscribe();
    drop(handle);

    assert!(!watcher.changed().await);
    assert!(watcher.snapshot().is_none());
}
