//! HTTP transport over `reqwest`

use futures::TryStreamExt;

use crate::error::{AgentError, Result};
use crate::message::ByteStream;
use crate::types::options::ClientOptions;

use super::Transport;

/// Longest error body kept in `AgentError::Http`
const MAX_ERROR_BODY: usize = 2048;

/// HTTP transport for the agent service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    options: ClientOptions,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// Streaming requests are only bounded by the connect timeout; the
    /// request timeout applies to the non-streaming calls.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the client cannot be built
    pub fn new(options: ClientOptions) -> Result<Self> {
        reqwest::Url::parse(&options.base_url).map_err(|e| {
            AgentError::invalid_config(format!("Invalid base URL '{}': {e}", options.base_url))
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| AgentError::invalid_config(format!("HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Options this transport was built with
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Turn a non-success response into `AgentError::Http`
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(AgentError::http(status.as_u16(), body))
    }
}

impl Transport for HttpTransport {
    async fn post_stream(&self, path: &str, body: serde_json::Value) -> Result<ByteStream> {
        let url = self.options.url(path);
        log::debug!("POST {url} (stream)");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(Box::pin(
            response.bytes_stream().map_err(std::io::Error::other),
        ))
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = self.options.url(path);
        log::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .timeout(self.options.request_timeout)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = self.options.url(path);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .timeout(self.options.request_timeout)
            .query(query)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.options.url(path);
        log::debug!("DELETE {url}");

        let response = self
            .client
            .delete(&url)
            .timeout(self.options.request_timeout)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
