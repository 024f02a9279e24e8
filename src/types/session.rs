//! Session data model
//!
//! A [`Session`] is one natural-language query lifecycle: from the moment the
//! question is submitted until the agent completes, errors, asks the user for
//! clarification, or the user cancels. Only the reducer mutates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::identifiers::SessionStateToken;
use super::sql::ResultSet;

// ============================================================================
// Status and phases
// ============================================================================

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// A stream is being consumed
    Running,
    /// The agent paused and asked the user a question
    NeedsUserInput,
    /// The agent finished
    Completed,
    /// The run failed
    Error,
    /// The user aborted the run
    Cancelled,
}

impl SessionStatus {
    /// Whether no further server events will be applied without user action
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NeedsUserInput | Self::Completed | Self::Error | Self::Cancelled
        )
    }

    /// Status name as used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::NeedsUserInput => "needs_user_input",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent phase within one iteration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    /// Model is thinking before it answers
    Thinking,
    /// Structured reasoning is streaming
    Reasoning,
    /// A tool call is being executed
    Acting,
    /// A tool result is being read
    Observing,
    /// Any phase this client does not know about
    Other(String),
}

impl From<String> for Phase {
    fn from(s: String) -> Self {
        match s.as_str() {
            "thinking" => Self::Thinking,
            "reasoning" => Self::Reasoning,
            "acting" => Self::Acting,
            "observing" => Self::Observing,
            _ => Self::Other(s),
        }
    }
}

impl From<Phase> for String {
    fn from(p: Phase) -> Self {
        p.as_str().to_string()
    }
}

impl Phase {
    /// Wire name of the phase
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Thinking => "thinking",
            Self::Reasoning => "reasoning",
            Self::Acting => "acting",
            Self::Observing => "observing",
            Self::Other(s) => s,
        }
    }
}

/// Kind of schema fact surfaced during reasoning
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetadataKind {
    /// A table
    Table,
    /// A column
    Column,
    /// A sample or literal value
    Value,
    /// A foreign-key style relationship
    Relationship,
    /// A constraint
    Constraint,
    /// Unrecognised item type, kept verbatim
    Other(String),
}

impl From<String> for MetadataKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "table" => Self::Table,
            "column" => Self::Column,
            "value" => Self::Value,
            "relationship" => Self::Relationship,
            "constraint" => Self::Constraint,
            _ => Self::Other(s),
        }
    }
}

impl From<MetadataKind> for String {
    fn from(k: MetadataKind) -> Self {
        match k {
            MetadataKind::Table => "table".into(),
            MetadataKind::Column => "column".into(),
            MetadataKind::Value => "value".into(),
            MetadataKind::Relationship => "relationship".into(),
            MetadataKind::Constraint => "constraint".into(),
            MetadataKind::Other(s) => s,
        }
    }
}

impl From<&str> for MetadataKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

// ============================================================================
// Finalized steps
// ============================================================================

/// How far along the agent thinks its SQL is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlCompleteness {
    /// Whether the SQL answers the question
    #[serde(default, alias = "isComplete")]
    pub is_complete: bool,
    /// What the agent still needs to find out
    #[serde(default, alias = "missingInfo")]
    pub missing_info: String,
    /// Free-form confidence label (e.g. "high")
    #[serde(default, alias = "confidenceLevel")]
    pub confidence_level: String,
}

/// Tool invocation chosen in a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    #[serde(default, alias = "tool_name")]
    pub name: String,
    /// Tool parameters
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// One finalized reasoning / act / observe cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Iteration number, unique within a session
    pub iteration: u32,
    /// Reasoning text
    #[serde(default)]
    pub reasoning: String,
    /// SQL snapshot at this point
    #[serde(default, alias = "partialSql")]
    pub partial_sql: String,
    /// Completeness assessment
    #[serde(default, alias = "sqlCompleteness")]
    pub sql_completeness: SqlCompleteness,
    /// Tool call chosen in this step
    #[serde(default, alias = "toolCall")]
    pub tool_call: ToolCall,
    /// Tool output, stringified when the server sends structured data
    #[serde(
        default,
        alias = "toolResult",
        deserialize_with = "string_or_json",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_result: Option<String>,
}

fn string_or_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// ============================================================================
// Live (not yet finalized) steps
// ============================================================================

/// Accumulating state for a step that is still streaming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveStepBuffer {
    /// Section key (e.g. `reasoning`, `partial_sql`, `tool_call.tool_name`) to text
    pub sections: BTreeMap<String, String>,
    /// Metadata items by kind, in arrival order
    pub metadata: BTreeMap<MetadataKind, Vec<serde_json::Value>>,
    /// Server is normalizing malformed model output for this step
    pub is_repairing: bool,
    /// Why the server started repairing, if it said
    pub repair_reason: Option<String>,
    /// Latest phase reported for this iteration
    pub phase: Option<Phase>,
    /// Data attached to the latest phase event
    pub phase_data: Option<serde_json::Value>,
}

impl LiveStepBuffer {
    /// Accumulated text of a section
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&str> {
        self.sections.get(key).map(String::as_str)
    }

    /// Metadata items of one kind
    #[must_use]
    pub fn items(&self, kind: &MetadataKind) -> &[serde_json::Value] {
        self.metadata.get(kind).map_or(&[], Vec::as_slice)
    }
}

// ============================================================================
// Agent response
// ============================================================================

/// Response payload carried by `completed` and `needs_user_input` events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final SQL produced by the agent
    #[serde(default, alias = "finalSql", skip_serializing_if = "Option::is_none")]
    pub final_sql: Option<String>,
    /// SQL after server-side validation
    #[serde(default, alias = "validatedSql", skip_serializing_if = "Option::is_none")]
    pub validated_sql: Option<String>,
    /// Result of executing the final SQL
    #[serde(default, alias = "executionResult", skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ResultSet>,
    /// Non-fatal warnings
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Clarifying question for the user
    #[serde(default, alias = "questionToUser", skip_serializing_if = "Option::is_none")]
    pub question_to_user: Option<String>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Session
// ============================================================================

/// One natural-language query interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    /// Submitted question
    pub question: String,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Most recent iteration number seen
    pub current_iteration: u32,
    /// Most recent phase seen
    pub current_phase: Option<Phase>,
    /// Finalized steps in ascending iteration order
    pub steps: Vec<Step>,
    /// Steps still streaming
    pub live_by_iteration: BTreeMap<u32, LiveStepBuffer>,
    /// Final SQL
    pub final_sql: Option<String>,
    /// Validated SQL
    pub validated_sql: Option<String>,
    /// Execution result of the final SQL
    pub execution_result: Option<ResultSet>,
    /// Warnings from the last response
    pub warnings: Vec<String>,
    /// Question the agent asked the user
    pub question_to_user: Option<String>,
    /// Error message for failed runs
    pub error: Option<String>,
    /// Latest resumption token
    pub session_state: Option<SessionStateToken>,
    /// Raw model tokens, for debugging only
    pub raw_stream: String,
    /// Answer submitted while paused, until the resumed run starts streaming
    pub pending_answer: Option<String>,
    /// Last full response payload
    pub response: Option<AgentResponse>,
}

impl Session {
    /// Create an idle session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized step for an iteration
    #[must_use]
    pub fn step(&self, iteration: u32) -> Option<&Step> {
        self.steps
            .binary_search_by_key(&iteration, |s| s.iteration)
            .ok()
            .map(|idx| &self.steps[idx])
    }

    /// Live buffer for an iteration
    #[must_use]
    pub fn live(&self, iteration: u32) -> Option<&LiveStepBuffer> {
        self.live_by_iteration.get(&iteration)
    }

    /// SQL to show the user: validated if available, else final, else the
    /// latest partial snapshot
    #[must_use]
    pub fn display_sql(&self) -> Option<&str> {
        self.validated_sql
            .as_deref()
            .or(self.final_sql.as_deref())
            .or_else(|| {
                self.steps
                    .iter()
                    .rev()
                    .map(|s| s.partial_sql.as_str())
                    .find(|sql| !sql.is_empty())
            })
    }
}
