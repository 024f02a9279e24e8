//! `AgentClient` and `QueryRunner`
//!
//! This module provides typed access to the agent service endpoints and the
//! runner that drives one interactive session:
//! - Streaming ReAct queries decoded into [`AgentEvent`](crate::AgentEvent)s
//! - Direct SQL execution and the format-with-AI stream
//! - Query history
//! - One active stream per session, with cancellation and resume
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      QueryRunner                          │
//! │                                                           │
//! │  ask / answer / cancel        ┌──────────────────────┐    │
//! │         │                     │   Consumer task      │    │
//! │         ▼                     │                      │    │
//! │  ┌──────────────┐  stream     │ • select! cancel vs  │    │
//! │  │ AgentClient  │────────────▶│   next event         │    │
//! │  │ (Transport)  │             │ • apply(generation)  │    │
//! │  └──────────────┘             └──────────┬───────────┘    │
//! │                                          ▼                │
//! │                               ┌──────────────────────┐    │
//! │                               │    SessionHandle     │───▶ watchers
//! │                               └──────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! **Key Design Points:**
//! - The consumer task is the only writer; watchers pull snapshots
//! - Starting a new question cancels the previous consumer and moves the
//!   session to a new generation, so stale events are rejected
//! - Dropping the event stream closes the HTTP connection
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use text2sql_agent::{AgentClient, ClientOptions, QueryRunner, SessionStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(AgentClient::new(ClientOptions::default())?);
//! let mut runner = QueryRunner::new(client);
//!
//! runner.ask("How many orders shipped last week?");
//! let session = runner.wait().await?;
//!
//! if session.status == SessionStatus::Completed {
//!     log::info!("SQL: {:?}", session.final_sql);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Clarification
//!
//! ```no_run
//! use std::sync::Arc;
//! use text2sql_agent::{AgentClient, ClientOptions, QueryRunner, SessionStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(AgentClient::new(ClientOptions::default())?);
//! let mut runner = QueryRunner::new(client);
//!
//! runner.ask("Show revenue by region");
//! let session = runner.wait().await?;
//! if session.status == SessionStatus::NeedsUserInput {
//!     runner.answer("Use the fiscal calendar")?;
//!     runner.wait().await?;
//! }
//! # Ok(())
//! # }
//! ```

mod client_impl;
mod runner;
mod tasks;

use crate::transport::{HttpTransport, Transport};
use crate::types::options::ClientOptions;

pub use runner::QueryRunner;

/// Client for the agent service endpoints
///
/// Generic over the [`Transport`] so tests can script server responses.
pub struct AgentClient<T: Transport = HttpTransport> {
    /// Transport layer
    transport: T,
    /// Client options
    options: ClientOptions,
}

impl<T: Transport> std::fmt::Debug for AgentClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("base_url", &self.options.base_url)
            .finish_non_exhaustive()
    }
}
