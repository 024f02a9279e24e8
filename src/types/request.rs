//! Request bodies sent to the agent service

use serde::{Deserialize, Serialize};

use super::identifiers::SessionStateToken;

/// Per-query defaults applied to every ReAct request
///
/// Loaded from settings; each field is forwarded to the server only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// Target database dialect (e.g. "postgresql")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbms: Option<String>,
    /// Tool-call budget for the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_calls: Option<u32>,
    /// Whether the server should execute the final SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_final_sql: Option<bool>,
    /// Server-side execution time budget, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sql_seconds: Option<u32>,
    /// Stream raw XML tokens for debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_stream_xml_tokens: Option<bool>,
}

/// Body of a ReAct streaming request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactRequest {
    /// Natural-language question
    pub question: String,
    /// Query defaults, flattened into the body
    #[serde(flatten)]
    pub defaults: QueryDefaults,
    /// Token of the paused session being resumed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<SessionStateToken>,
    /// Answer to the agent's clarifying question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_response: Option<String>,
}

impl ReactRequest {
    /// Create a request for a fresh question
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            defaults: QueryDefaults::default(),
            session_state: None,
            user_response: None,
        }
    }

    /// Apply query defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the database dialect
    #[must_use]
    pub fn dbms(mut self, dbms: impl Into<String>) -> Self {
        self.defaults.dbms = Some(dbms.into());
        self
    }

    /// Set the tool-call budget
    #[must_use]
    pub const fn max_tool_calls(mut self, max: u32) -> Self {
        self.defaults.max_tool_calls = Some(max);
        self
    }

    /// Ask the server to execute the final SQL
    #[must_use]
    pub const fn execute_final_sql(mut self, execute: bool) -> Self {
        self.defaults.execute_final_sql = Some(execute);
        self
    }

    /// Set the server-side SQL time budget
    #[must_use]
    pub const fn max_sql_seconds(mut self, seconds: u32) -> Self {
        self.defaults.max_sql_seconds = Some(seconds);
        self
    }

    /// Turn a fresh request into a resume request
    #[must_use]
    pub fn resume(mut self, state: Option<SessionStateToken>, answer: impl Into<String>) -> Self {
        self.session_state = state;
        self.user_response = Some(answer.into());
        self
    }
}

/// Body of a format-with-AI request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatRequest {
    /// SQL to validate, run and explain
    pub sql: String,
    /// Question the SQL answers, used as formatting context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Target database dialect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbms: Option<String>,
}

impl FormatRequest {
    /// Create a format request for raw SQL
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            question: None,
            dbms: None,
        }
    }

    /// Attach the originating question
    #[must_use]
    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Set the database dialect
    #[must_use]
    pub fn dbms(mut self, dbms: impl Into<String>) -> Self {
        self.dbms = Some(dbms.into());
        self
    }
}
