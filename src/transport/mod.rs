//! Transport layer for communicating with the agent service
//!
//! This module provides the transport abstraction and the HTTP
//! implementation used in production. Tests plug in scripted transports.

pub mod http;

use crate::error::Result;
use crate::message::ByteStream;

/// Transport trait for communicating with the agent service
///
/// Paths are relative to whatever base the implementation is configured with.
/// Implementations report non-success statuses as errors before returning
/// any body.
pub trait Transport: Send + Sync + 'static {
    /// POST a JSON body and return the raw streaming response body
    ///
    /// # Errors
    /// Returns error if the request fails or the status is not a success
    fn post_stream(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<ByteStream>> + Send;

    /// POST a JSON body and return the JSON response
    ///
    /// # Errors
    /// Returns error if the request fails, the status is not a success, or
    /// the body is not JSON
    fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<serde_json::Value>> + Send;

    /// GET a JSON resource
    ///
    /// # Errors
    /// Returns error if the request fails, the status is not a success, or
    /// the body is not JSON
    fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl std::future::Future<Output = Result<serde_json::Value>> + Send;

    /// DELETE a resource
    ///
    /// # Errors
    /// Returns error if the request fails or the status is not a success
    fn delete(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub use http::HttpTransport;
