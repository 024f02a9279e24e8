//! # text2sql_agent
//!
//! A Rust client for a ReAct-style text-to-SQL agent service. The service
//! answers a natural-language question with a stream of newline-delimited
//! JSON events; this crate decodes that stream, folds the events into a
//! [`Session`], and exposes the session to any number of observers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use text2sql_agent::{AgentClient, ClientOptions, QueryRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions::builder()
//!         .base_url("http://127.0.0.1:8000")
//!         .build();
//!     let client = Arc::new(AgentClient::new(options)?);
//!
//!     let mut runner = QueryRunner::new(client);
//!     runner.ask("Top 5 customers by revenue");
//!     let session = runner.wait().await?;
//!
//!     log::info!("{}: {:?}", session.status, session.display_sql());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Event decoding
//!
//! [`NdjsonDecoder`] splits a byte stream into lines regardless of how the
//! network chunks it, and turns each line into an [`AgentEvent`] or
//! [`FormatEvent`]. Malformed lines are skipped with a warning unless
//! [`DecodePolicy::Strict`] is selected.
//!
//! ### 2. Session reduction
//!
//! [`Session::apply`] is the pure state machine: live section and metadata
//! buffers per iteration, finalized steps, the terminal response, and the
//! status lifecycle `idle -> running -> completed | needs_user_input | error
//! | cancelled`.
//!
//! ### 3. Interactive runs
//!
//! [`QueryRunner`] keeps one stream per session, cancels it on demand, and
//! resumes a paused session with the user's answer and the server's opaque
//! `session_state` token.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use text2sql_agent::{AgentClient, ClientOptions, QueryRunner};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Arc::new(AgentClient::new(ClientOptions::default())?);
//! let mut runner = QueryRunner::new(client);
//! let mut watcher = runner.handle().subscribe();
//!
//! runner.ask("Orders per month in 2024");
//! while watcher.changed().await {
//!     let Some(session) = watcher.snapshot() else { break };
//!     if session.status.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### 4. Direct SQL, formatting and history
//!
//! [`AgentClient`] also executes SQL directly, runs the format-with-AI
//! stream, and manages the server's query history (see [`history`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod history;
pub mod message;
pub mod session;
pub mod settings;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use client::{AgentClient, QueryRunner};
pub use error::{AgentError, Result};
pub use history::HistoryList;
pub use message::{EventStream, NdjsonDecoder, decode_stream, parse_agent_event};
pub use session::{Applied, FormatSession, FormatStage, SessionHandle, SessionWatcher};
pub use settings::Settings;
pub use transport::{HttpTransport, Transport};

// Re-export type submodules for flat public API
pub use types::events::{AgentEvent, FormatEvent};
pub use types::history::{HistoryEntry, HistoryPage};
pub use types::identifiers::{HistoryId, RunId, SessionStateToken};
pub use types::options::{ClientOptions, ClientOptionsBuilder, DecodePolicy, Endpoints};
pub use types::request::{FormatRequest, QueryDefaults, ReactRequest};
pub use types::session::{
    AgentResponse, LiveStepBuffer, MetadataKind, Phase, Session, SessionStatus, SqlCompleteness,
    Step, ToolCall,
};
pub use types::sql::{ResultSet, SqlExecution};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
