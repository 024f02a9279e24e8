//! Error types for the text-to-SQL agent client

use thiserror::Error;

/// Main error type for the agent client
#[derive(Error, Debug)]
pub enum AgentError {
    /// Network failure talking to the agent service
    #[error("Transport error: {0}")]
    Transport(String),

    /// The agent service answered with a non-success status
    #[error("HTTP error (status {status}): {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// A stream line could not be turned into a known event
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw line that failed to parse
        line: Option<String>,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the session's current status
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Settings could not be loaded or saved
    #[error("Settings error: {0}")]
    Settings(String),
}

/// Result type alias for agent client operations
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, line: Option<String>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            line,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Whether the error happened before the service produced a response
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. } | Self::Io(_))
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), err.to_string());
        }
        Self::Transport(err.to_string())
    }
}
