//! Client options and configuration
//!
//! This module contains the connection options for the agent client,
//! including a builder pattern for easy configuration.

use std::time::Duration;

use super::request::QueryDefaults;

/// Default maximum length of one stream line (1MB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Default timeout for non-streaming requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connect timeout for all requests
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default base URL of the agent service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

// ============================================================================
// Decode policy
// ============================================================================

/// What the decoder does with a line it cannot turn into an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Drop the line, log a warning, keep going
    #[default]
    Lenient,
    /// Fail the stream with a parse error
    Strict,
}

// ============================================================================
// Endpoint paths
// ============================================================================

/// Paths of the agent service endpoints, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// ReAct NDJSON stream
    pub react_stream: String,
    /// Direct SQL execution
    pub execute_sql: String,
    /// Format-with-AI NDJSON stream
    pub format_stream: String,
    /// History collection
    pub history: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            react_stream: "/api/react/stream".to_string(),
            execute_sql: "/api/sql/execute".to_string(),
            format_stream: "/api/sql/format/stream".to_string(),
            history: "/api/history".to_string(),
        }
    }
}

// ============================================================================
// Client Options
// ============================================================================

/// Main options for the agent client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the agent service
    pub base_url: String,
    /// Endpoint paths
    pub endpoints: Endpoints,
    /// Timeout for non-streaming requests
    pub request_timeout: Duration,
    /// Connect timeout for all requests
    pub connect_timeout: Duration,
    /// Maximum length of one stream line
    pub max_line_bytes: usize,
    /// Handling of malformed stream lines
    pub decode_policy: DecodePolicy,
    /// Defaults applied to every ReAct request
    pub query_defaults: QueryDefaults,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            decode_policy: DecodePolicy::default(),
            query_defaults: QueryDefaults::default(),
        }
    }
}

impl ClientOptions {
    /// Create a new builder for `ClientOptions`
    #[must_use]
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Join the base URL and an endpoint path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// ============================================================================
// Builder for ClientOptions
// ============================================================================

/// Builder for `ClientOptions`
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    /// Set endpoint paths
    #[must_use]
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.options.endpoints = endpoints;
        self
    }

    /// Set the timeout for non-streaming requests
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the maximum stream line length
    ///
    /// # Panics
    /// Panics if `bytes` is zero
    #[must_use]
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "max_line_bytes must be positive");
        self.options.max_line_bytes = bytes;
        self
    }

    /// Set the malformed-line policy
    #[must_use]
    pub const fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.options.decode_policy = policy;
        self
    }

    /// Set per-query defaults
    #[must_use]
    pub fn query_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.options.query_defaults = defaults;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClientOptions {
        self.options
    }
}
