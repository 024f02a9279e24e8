//! Streaming event definitions
//!
//! Every line of the agent service's NDJSON stream is one JSON object with an
//! `event` discriminator. [`AgentEvent`] covers the ReAct endpoint and
//! [`FormatEvent`] the format-with-AI endpoint.

use serde::{Deserialize, Serialize};

use super::identifiers::SessionStateToken;
use super::session::{AgentResponse, MetadataKind, Phase, Step};
use super::sql::ResultSet;

// ============================================================================
// ReAct stream
// ============================================================================

/// One event of the ReAct stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Raw model token (debug only)
    Token {
        /// Iteration the token belongs to
        #[serde(default)]
        iteration: u32,
        /// Token text
        token: String,
    },
    /// Incremental text for a named section of a live step
    SectionDelta {
        /// Iteration the section belongs to
        iteration: u32,
        /// Section key
        section: String,
        /// Text to append
        delta: String,
    },
    /// Schema fact discovered during reasoning
    MetadataItem {
        /// Iteration the item belongs to
        iteration: u32,
        /// Item kind
        item_type: MetadataKind,
        /// Key-value record
        item: serde_json::Value,
    },
    /// Server is normalizing malformed model output
    FormatRepair {
        /// Iteration being repaired
        iteration: u32,
        /// Why the repair started
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Phase change within an iteration
    Phase {
        /// New phase
        phase: Phase,
        /// Iteration the phase belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iteration: Option<u32>,
        /// Phase-specific data
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        data: serde_json::Value,
        /// Resumption token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<SessionStateToken>,
    },
    /// Finalized step
    Step {
        /// Step payload
        step: Step,
        /// Resumption token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<SessionStateToken>,
    },
    /// The agent finished
    Completed {
        /// Final response
        #[serde(default)]
        response: AgentResponse,
        /// Resumption token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<SessionStateToken>,
    },
    /// The agent needs a clarification from the user
    NeedsUserInput {
        /// Response carrying the question
        #[serde(default)]
        response: AgentResponse,
        /// Resumption token to send back with the answer
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<SessionStateToken>,
    },
    /// The agent failed
    Error {
        /// Error message; an error event wins even without one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl AgentEvent {
    /// Wire name of the event
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::SectionDelta { .. } => "section_delta",
            Self::MetadataItem { .. } => "metadata_item",
            Self::FormatRepair { .. } => "format_repair",
            Self::Phase { .. } => "phase",
            Self::Step { .. } => "step",
            Self::Completed { .. } => "completed",
            Self::NeedsUserInput { .. } => "needs_user_input",
            Self::Error { .. } => "error",
        }
    }

    /// Iteration the event refers to, if any
    #[must_use]
    pub fn iteration(&self) -> Option<u32> {
        match self {
            Self::Token { iteration, .. }
            | Self::SectionDelta { iteration, .. }
            | Self::MetadataItem { iteration, .. }
            | Self::FormatRepair { iteration, .. } => Some(*iteration),
            Self::Phase { iteration, .. } => *iteration,
            Self::Step { step, .. } => Some(step.iteration),
            Self::Completed { .. } | Self::NeedsUserInput { .. } | Self::Error { .. } => None,
        }
    }

    /// Whether the event ends the run on the server side
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::NeedsUserInput { .. } | Self::Error { .. }
        )
    }
}

// ============================================================================
// Format-with-AI stream
// ============================================================================

/// One event of the format-with-AI stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormatEvent {
    /// SQL is being validated
    Validating,
    /// SQL is being executed
    Executing,
    /// The model is formatting the result
    Formatting,
    /// Raw execution result
    Result {
        /// Result set
        result: ResultSet,
    },
    /// Formatted-answer token
    FormatToken {
        /// Token text
        token: String,
    },
    /// Formatting finished
    FormatDone {
        /// Full formatted text, when the server sends it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formatted: Option<String>,
    },
    /// Validation, execution or formatting failed
    Error {
        /// Error message
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Stream finished
    Completed,
}
