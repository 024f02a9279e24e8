//! Unit tests for the session reducer
//!
//! Tests the pure state transitions of `Session::apply`

use serde_json::json;
use text2sql_agent::message::parse_event;
use text2sql_agent::{AgentEvent, Applied, MetadataKind, Phase, Session, SessionStatus};

fn ev(value: serde_json::Value) -> AgentEvent {
    parse_event(value).unwrap()
}

fn running() -> Session {
    let mut session = Session::new();
    session.start("How many orders?");
    session
}

fn delta(iteration: u32, section: &str, text: &str) -> AgentEvent {
    ev(json!({"event": "section_delta", "iteration": iteration, "section": section, "delta": text}))
}

fn step(iteration: u32, reasoning: &str) -> AgentEvent {
    ev(json!({"event": "step", "step": {"iteration": iteration, "reasoning": reasoning}}))
}

fn completed(sql: &str) -> AgentEvent {
    ev(json!({"event": "completed", "response": {"final_sql": sql}}))
}

#[test]
fn test_start_resets_session() {
    let mut session = running();
    session.apply(delta(1, "reasoning", "x"));
    session.apply(completed("SELECT 1"));

    session.start("Next question");
    assert_eq!(session.status, SessionStatus::Running);
    assert_eq!(session.question, "Next question");
    assert!(session.steps.is_empty());
    assert!(session.live_by_iteration.is_empty());
    assert!(session.final_sql.is_none());
    assert_eq!(session.current_iteration, 0);
}

#[test]
fn test_section_delta_chunking_invariance() {
    let mut chunked = running();
    for part in ["SEL", "ECT co", "unt(*) ", "FROM orders"] {
        chunked.apply(delta(1, "partial_sql", part));
    }

    let mut whole = running();
    whole.apply(delta(1, "partial_sql", "SELECT count(*) FROM orders"));

    assert_eq!(
        chunked.live(1).unwrap().section("partial_sql"),
        Some("SELECT count(*) FROM orders")
    );
    assert_eq!(chunked.live_by_iteration, whole.live_by_iteration);
}

#[test]
fn test_sections_are_independent() {
    let mut session = running();
    session.apply(delta(1, "reasoning", "Look at "));
    session.apply(delta(1, "tool_call.tool_name", "list_"));
    session.apply(delta(1, "reasoning", "orders"));
    session.apply(delta(1, "tool_call.tool_name", "tables"));
    session.apply(delta(2, "reasoning", "Then join"));

    let live = session.live(1).unwrap();
    assert_eq!(live.section("reasoning"), Some("Look at orders"));
    assert_eq!(live.section("tool_call.tool_name"), Some("list_tables"));
    assert_eq!(session.live(2).unwrap().section("reasoning"), Some("Then join"));
    assert_eq!(session.current_iteration, 2);
}

#[test]
fn test_metadata_arrival_order_without_dedup() {
    let mut session = running();
    let items = [
        json!({"name": "orders"}),
        json!({"name": "customers"}),
        json!({"name": "orders"}),
    ];
    for item in &items {
        session.apply(ev(json!({
            "event": "metadata_item",
            "iteration": 1,
            "item_type": "table",
            "item": item
        })));
    }
    session.apply(ev(json!({
        "event": "metadata_item",
        "iteration": 1,
        "item_type": "column",
        "item": {"table": "orders", "name": "total"}
    })));

    let live = session.live(1).unwrap();
    assert_eq!(live.items(&MetadataKind::Table), &items[..]);
    assert_eq!(live.items(&MetadataKind::Column).len(), 1);
    assert!(live.items(&MetadataKind::Relationship).is_empty());
}

#[test]
fn test_step_replaces_live_buffer_and_prior_step() {
    let mut session = running();
    session.apply(delta(1, "reasoning", "draft"));
    session.apply(ev(json!({"event": "format_repair", "iteration": 1, "reason": "bad xml"})));
    assert!(session.live(1).unwrap().is_repairing);

    assert_eq!(session.apply(step(1, "first")), Applied::Changed);
    assert!(session.live(1).is_none());
    assert_eq!(session.steps.len(), 1);

    session.apply(step(1, "revised"));
    assert_eq!(session.steps.len(), 1);
    assert_eq!(session.step(1).unwrap().reasoning, "revised");
}

#[test]
fn test_steps_stay_sorted() {
    let mut session = running();
    session.apply(step(3, "c"));
    session.apply(step(1, "a"));
    session.apply(step(2, "b"));

    let order: Vec<u32> = session.steps.iter().map(|s| s.iteration).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(session.current_iteration, 3);
}

#[test]
fn test_late_live_update_for_finalized_iteration_ignored() {
    let mut session = running();
    session.apply(step(1, "done"));

    assert_eq!(session.apply(delta(1, "reasoning", "late")), Applied::Ignored);
    assert!(session.live(1).is_none());
    assert_eq!(session.step(1).unwrap().reasoning, "done");
}

#[test]
fn test_phase_tracks_current_phase_and_state() {
    let mut session = running();
    session.apply(ev(json!({
        "event": "phase",
        "phase": "thinking",
        "iteration": 1,
        "data": {"hint": "schema"},
        "state": "tok-1"
    })));

    assert_eq!(session.current_phase, Some(Phase::Thinking));
    assert_eq!(session.current_iteration, 1);
    let live = session.live(1).unwrap();
    assert_eq!(live.phase, Some(Phase::Thinking));
    assert_eq!(live.phase_data.as_ref().unwrap()["hint"], "schema");
    assert_eq!(session.session_state.as_ref().unwrap().as_value(), "tok-1");

    // A null token does not erase the last one
    session.apply(ev(json!({"event": "phase", "phase": "acting", "state": null})));
    assert_eq!(session.current_phase, Some(Phase::Acting));
    assert_eq!(session.session_state.as_ref().unwrap().as_value(), "tok-1");
}

#[test]
fn test_token_feeds_raw_stream_only() {
    let mut session = running();
    session.apply(ev(json!({"event": "token", "token": "<reasoning>"})));
    session.apply(ev(json!({"event": "token", "token": "hi"})));

    assert_eq!(session.raw_stream, "<reasoning>hi");
    assert!(session.live_by_iteration.is_empty());
}

#[test]
fn test_completed_sets_result() {
    let mut session = running();
    session.apply(ev(json!({
        "event": "completed",
        "response": {
            "final_sql": "SELECT count(*) FROM orders",
            "validated_sql": "SELECT count(*) FROM orders;",
            "execution_result": {"columns": ["count"], "rows": [[42]], "row_count": 1, "execution_time_ms": 3.5},
            "warnings": ["sampled"]
        }
    })));

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.display_sql(), Some("SELECT count(*) FROM orders;"));
    let result = session.execution_result.as_ref().unwrap();
    assert_eq!(result.cell(0, "count"), Some(&json!(42)));
    assert_eq!(session.warnings, vec!["sampled"]);
}

#[test]
fn test_duplicate_completed_last_write_wins() {
    let mut session = running();
    session.apply(completed("SELECT 1"));
    assert_eq!(session.apply(completed("SELECT 2")), Applied::Changed);

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.final_sql.as_deref(), Some("SELECT 2"));
}

#[test]
fn test_events_after_completed_ignored() {
    let mut session = running();
    session.apply(completed("SELECT 1"));

    assert_eq!(
        session.apply(ev(json!({"event": "error", "message": "late"}))),
        Applied::Ignored
    );
    assert_eq!(session.apply(delta(5, "reasoning", "x")), Applied::Ignored);
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.error.is_none());
}

#[test]
fn test_error_is_terminal() {
    let mut session = running();
    session.apply(step(1, "a"));
    session.apply(ev(json!({"event": "error", "message": "db offline"})));

    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("db offline"));
    // Steps received before the error are kept
    assert_eq!(session.steps.len(), 1);

    assert_eq!(session.apply(completed("SELECT 1")), Applied::Ignored);
    assert_eq!(session.status, SessionStatus::Error);
}

#[test]
fn test_error_without_message() {
    let mut session = running();
    session.apply(ev(json!({"event": "error"})));
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("unknown error"));
}

#[test]
fn test_idle_session_ignores_events() {
    let mut session = Session::new();
    assert_eq!(session.apply(delta(1, "reasoning", "x")), Applied::Ignored);
    assert_eq!(session.apply(completed("SELECT 1")), Applied::Ignored);
    assert_eq!(session.status, SessionStatus::Idle);
}

#[test]
fn test_cancel_stops_mutation() {
    let mut session = running();
    session.apply(delta(1, "reasoning", "partial"));
    assert_eq!(session.cancel(), Applied::Changed);
    assert_eq!(session.status, SessionStatus::Cancelled);

    assert_eq!(session.apply(delta(1, "reasoning", " more")), Applied::Ignored);
    assert_eq!(session.apply(completed("SELECT 1")), Applied::Ignored);
    assert_eq!(session.live(1).unwrap().section("reasoning"), Some("partial"));
    assert_eq!(session.cancel(), Applied::Ignored);
}

#[test]
fn test_needs_user_input_pauses_until_answered() {
    let mut session = running();
    session.apply(step(1, "ambiguous"));
    session.apply(ev(json!({
        "event": "needs_user_input",
        "response": {"question_to_user": "Which year?"},
        "state": {"resume": 1}
    })));

    assert_eq!(session.status, SessionStatus::NeedsUserInput);
    assert_eq!(session.question_to_user.as_deref(), Some("Which year?"));
    assert_eq!(
        session.session_state.as_ref().unwrap().as_value(),
        &json!({"resume": 1})
    );

    // Nothing but an error or another question lands while paused
    assert_eq!(session.apply(delta(2, "reasoning", "x")), Applied::Ignored);

    session.submit_answer("2024").unwrap();
    assert_eq!(session.status, SessionStatus::NeedsUserInput);
    assert_eq!(session.pending_answer.as_deref(), Some("2024"));

    // First event of the resumed stream moves back to running
    assert_eq!(session.apply(delta(2, "reasoning", "Use 2024")), Applied::Changed);
    assert_eq!(session.status, SessionStatus::Running);
    assert!(session.pending_answer.is_none());
    assert!(session.question_to_user.is_none());
    assert_eq!(session.steps.len(), 1);
}

#[test]
fn test_resume_reported_even_when_first_event_is_dropped() {
    let mut session = running();
    session.apply(step(1, "ambiguous"));
    session.apply(ev(json!({
        "event": "needs_user_input",
        "response": {"question_to_user": "Which year?"}
    })));
    session.submit_answer("2024").unwrap();

    // Late live update for a finalized iteration still resumes the run
    assert_eq!(session.apply(delta(1, "reasoning", "late")), Applied::Changed);
    assert_eq!(session.status, SessionStatus::Running);
    assert!(session.question_to_user.is_none());
    assert!(session.pending_answer.is_none());
    assert!(session.live(1).is_none());

    // Once running, the same late update is plainly ignored
    assert_eq!(session.apply(delta(1, "reasoning", "late")), Applied::Ignored);
}

#[test]
fn test_null_state_token_is_not_recorded() {
    let mut session = running();
    session.apply(ev(json!({"event": "step", "step": {"iteration": 1}, "state": {"k": 1}})));
    session.apply(ev(json!({"event": "step", "step": {"iteration": 2}, "state": null})));
    assert_eq!(
        session.session_state.as_ref().unwrap().as_value(),
        &json!({"k": 1})
    );
}

#[test]
fn test_answer_rejected_unless_paused() {
    let mut session = running();
    assert!(session.submit_answer("hello").is_err());
    assert!(session.pending_answer.is_none());
}

#[test]
fn test_fail_marks_error() {
    let mut session = running();
    assert_eq!(session.fail("connection reset"), Applied::Changed);
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("connection reset"));
    assert_eq!(session.fail("again"), Applied::Ignored);
}
