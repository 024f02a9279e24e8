//! Format-with-AI state
//!
//! Folds the events of the format stream (validate, execute, explain) into
//! a single view of the result and the formatted answer.

use serde::Serialize;

use super::reducer::{Applied, UNKNOWN_ERROR};
use crate::types::events::FormatEvent;
use crate::types::sql::ResultSet;

/// Stage of a format-with-AI run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStage {
    /// Nothing received yet
    #[default]
    Pending,
    /// SQL is being validated
    Validating,
    /// SQL is being executed
    Executing,
    /// The model is writing the answer
    Formatting,
    /// Stream completed
    Done,
    /// Stream reported an error
    Failed,
}

/// Accumulated state of one format-with-AI run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatSession {
    /// Current stage
    pub stage: FormatStage,
    /// Execution result, once available
    pub result: Option<ResultSet>,
    /// Formatted answer text
    pub formatted_text: String,
    /// Error message, if the run failed
    pub error: Option<String>,
}

impl FormatSession {
    /// Create an empty format session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run has ended
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.stage, FormatStage::Done | FormatStage::Failed)
    }

    /// Apply one format event
    pub fn apply(&mut self, event: FormatEvent) -> Applied {
        if self.is_finished() {
            return Applied::Ignored;
        }
        match event {
            FormatEvent::Validating => self.stage = FormatStage::Validating,
            FormatEvent::Executing => self.stage = FormatStage::Executing,
            FormatEvent::Formatting => self.stage = FormatStage::Formatting,
            FormatEvent::Result { result } => self.result = Some(result),
            FormatEvent::FormatToken { token } => {
                self.stage = FormatStage::Formatting;
                self.formatted_text.push_str(&token);
            }
            FormatEvent::FormatDone { formatted } => {
                if let Some(formatted) = formatted {
                    self.formatted_text = formatted;
                }
            }
            FormatEvent::Error { message } => {
                self.stage = FormatStage::Failed;
                self.error = Some(message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()));
            }
            FormatEvent::Completed => self.stage = FormatStage::Done,
        }
        Applied::Changed
    }
}
