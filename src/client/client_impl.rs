//! `AgentClient` implementation
//!
//! This module contains the constructors and endpoint methods for `AgentClient`.

use futures::StreamExt;

use crate::error::{AgentError, Result};
use crate::message::{EventStream, NdjsonDecoder, decode_stream};
use crate::session::FormatSession;
use crate::transport::{HttpTransport, Transport};
use crate::types::events::{AgentEvent, FormatEvent};
use crate::types::history::HistoryPage;
use crate::types::identifiers::HistoryId;
use crate::types::options::ClientOptions;
use crate::types::request::{FormatRequest, ReactRequest};
use crate::types::sql::{SqlExecution, SqlRequest};

impl super::AgentClient<HttpTransport> {
    /// Create a client talking HTTP to `options.base_url`
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = HttpTransport::new(options.clone())?;
        Ok(Self::with_transport(transport, options))
    }
}

impl<T: Transport> super::AgentClient<T> {
    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: T, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    /// Client options
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn decoder<E>(&self) -> NdjsonDecoder<E> {
        NdjsonDecoder::new(self.options.max_line_bytes, self.options.decode_policy)
    }

    /// Open a ReAct stream
    ///
    /// Fails before yielding anything if the request cannot be sent or the
    /// server answers with a non-success status.
    ///
    /// # Errors
    /// Returns a transport or HTTP error
    pub async fn stream_react(&self, request: &ReactRequest) -> Result<EventStream<AgentEvent>> {
        let body = serde_json::to_value(request)?;
        let bytes = self
            .transport
            .post_stream(&self.options.endpoints.react_stream, body)
            .await?;
        Ok(decode_stream(bytes, self.decoder()))
    }

    /// Execute raw SQL directly
    ///
    /// SQL errors are returned as [`SqlExecution::Failed`], including client
    /// errors (4xx) whose body names the failure.
    ///
    /// # Errors
    /// Returns a transport error, a server error (5xx), or a JSON error
    pub async fn execute_sql(&self, sql: &str, dbms: Option<&str>) -> Result<SqlExecution> {
        let request = SqlRequest {
            sql: sql.to_string(),
            dbms: dbms.map(str::to_string),
        };
        let body = serde_json::to_value(&request)?;
        match self
            .transport
            .post_json(&self.options.endpoints.execute_sql, body)
            .await
        {
            Ok(value) => SqlExecution::from_value(value),
            Err(AgentError::Http { status, body }) if (400..500).contains(&status) => {
                Ok(SqlExecution::Failed {
                    error: inline_error(&body),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Open a format-with-AI stream
    ///
    /// # Errors
    /// Returns a transport or HTTP error
    pub async fn stream_format_sql(
        &self,
        request: &FormatRequest,
    ) -> Result<EventStream<FormatEvent>> {
        let body = serde_json::to_value(request)?;
        let bytes = self
            .transport
            .post_stream(&self.options.endpoints.format_stream, body)
            .await?;
        Ok(decode_stream(bytes, self.decoder()))
    }

    /// Run a format-with-AI request to completion
    ///
    /// Stream errors after the first event, or a stream that closes before
    /// `completed`, end the run as failed rather than returning `Err`.
    ///
    /// # Errors
    /// Returns a transport or HTTP error if the stream cannot be opened
    pub async fn format_sql(&self, request: &FormatRequest) -> Result<FormatSession> {
        let mut stream = self.stream_format_sql(request).await?;
        let mut session = FormatSession::new();
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    session.apply(event);
                    if session.is_finished() {
                        break;
                    }
                }
                Err(e) => {
                    session.apply(FormatEvent::Error {
                        message: Some(e.to_string()),
                    });
                    break;
                }
            }
        }
        if !session.is_finished() {
            log::warn!("Format stream closed in stage {:?}", session.stage);
            session.apply(FormatEvent::Error {
                message: Some("stream ended before formatting finished".to_string()),
            });
        }
        Ok(session)
    }

    /// Fetch one page of query history
    ///
    /// # Errors
    /// Returns a transport, HTTP or JSON error
    pub async fn list_history(&self, page: usize, page_size: usize) -> Result<HistoryPage> {
        let query = [("page", page.to_string()), ("page_size", page_size.to_string())];
        let value = self
            .transport
            .get_json(&self.options.endpoints.history, &query)
            .await?;

        // Some servers return a bare array
        if value.is_array() {
            let items: Vec<_> = serde_json::from_value(value)?;
            return Ok(HistoryPage {
                total: items.len(),
                page,
                page_size,
                items,
            });
        }
        let mut history: HistoryPage = serde_json::from_value(value)?;
        if history.page_size == 0 {
            history.page_size = page_size;
        }
        Ok(history)
    }

    /// Delete one history entry
    ///
    /// # Errors
    /// Returns a transport or HTTP error
    pub async fn delete_history(&self, id: &HistoryId) -> Result<()> {
        let path = format!(
            "{}/{}",
            self.options.endpoints.history.trim_end_matches('/'),
            id
        );
        self.transport.delete(&path).await
    }

    /// Delete all history entries
    ///
    /// # Errors
    /// Returns a transport or HTTP error
    pub async fn clear_history(&self) -> Result<()> {
        self.transport.delete(&self.options.endpoints.history).await
    }
}

/// Extract a human-readable message from an error body
fn inline_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
