//! Unit tests for the format-with-AI reducer

use serde_json::json;
use text2sql_agent::message::parse_event;
use text2sql_agent::{Applied, FormatEvent, FormatSession, FormatStage};

fn ev(value: serde_json::Value) -> FormatEvent {
    parse_event(value).unwrap()
}

#[test]
fn test_stages_and_token_accumulation() {
    let mut session = FormatSession::new();
    assert_eq!(session.stage, FormatStage::Pending);

    session.apply(ev(json!({"event": "validating"})));
    assert_eq!(session.stage, FormatStage::Validating);
    session.apply(ev(json!({"event": "executing"})));
    assert_eq!(session.stage, FormatStage::Executing);

    session.apply(ev(json!({
        "event": "result",
        "result": {"columns": ["region", "revenue"], "rows": [["EU", 10.5]], "row_count": 1, "execution_time_ms": 12.0}
    })));
    session.apply(ev(json!({"event": "format_token", "token": "EU leads "})));
    assert_eq!(session.stage, FormatStage::Formatting);
    session.apply(ev(json!({"event": "format_token", "token": "with 10.5."})));
    session.apply(ev(json!({"event": "format_done"})));
    assert!(!session.is_finished());
    session.apply(ev(json!({"event": "completed"})));

    assert_eq!(session.stage, FormatStage::Done);
    assert!(session.is_finished());
    assert_eq!(session.formatted_text, "EU leads with 10.5.");
    assert_eq!(session.result.as_ref().unwrap().columns, vec!["region", "revenue"]);
    assert!(session.error.is_none());
}

#[test]
fn test_format_done_replaces_streamed_text() {
    let mut session = FormatSession::new();
    session.apply(ev(json!({"event": "format_token", "token": "draf"})));
    session.apply(ev(json!({"event": "format_done", "formatted": "Final answer"})));
    assert_eq!(session.formatted_text, "Final answer");
}

#[test]
fn test_error_ends_run() {
    let mut session = FormatSession::new();
    session.apply(ev(json!({"event": "validating"})));
    session.apply(ev(json!({"event": "error", "message": "relation \"x\" does not exist"})));

    assert_eq!(session.stage, FormatStage::Failed);
    assert_eq!(session.error.as_deref(), Some("relation \"x\" does not exist"));

    assert_eq!(
        session.apply(ev(json!({"event": "completed"}))),
        Applied::Ignored
    );
    assert_eq!(session.stage, FormatStage::Failed);
}

#[test]
fn test_error_without_message() {
    let mut session = FormatSession::new();
    session.apply(ev(json!({"event": "error"})));
    assert_eq!(session.error.as_deref(), Some("unknown error"));
}
