//! Event parser for agent service stream lines

use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};
use crate::types::events::{AgentEvent, FormatEvent};

/// Parse a JSON value into a typed stream event
///
/// # Arguments
/// * `data` - Raw JSON value of one stream line
///
/// # Returns
/// Parsed event or error
///
/// # Errors
/// Returns `AgentError::MessageParse` if the value is not an object with a
/// known `event` discriminator and the fields that event requires
pub fn parse_event<E: DeserializeOwned>(data: serde_json::Value) -> Result<E> {
    if !data.is_object() {
        return Err(AgentError::message_parse(
            "Stream line is not a JSON object",
            Some(data.to_string()),
        ));
    }
    if data.get("event").and_then(|e| e.as_str()).is_none() {
        return Err(AgentError::message_parse(
            "Stream line has no `event` discriminator",
            Some(data.to_string()),
        ));
    }
    serde_json::from_value(data.clone()).map_err(|e| {
        AgentError::message_parse(format!("Failed to parse event: {e}"), Some(data.to_string()))
    })
}

/// Parse one raw stream line into a typed event
///
/// # Errors
/// Returns `AgentError::MessageParse` for invalid JSON or unknown shapes
pub fn parse_line<E: DeserializeOwned>(line: &str) -> Result<E> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        AgentError::message_parse(format!("Invalid JSON: {e}"), Some(line.to_string()))
    })?;
    parse_event(value)
}

/// Parse a ReAct stream line
///
/// # Errors
/// See [`parse_line`]
pub fn parse_agent_event(line: &str) -> Result<AgentEvent> {
    parse_line(line)
}

/// Parse a format-with-AI stream line
///
/// # Errors
/// See [`parse_line`]
pub fn parse_format_event(line: &str) -> Result<FormatEvent> {
    parse_line(line)
}
