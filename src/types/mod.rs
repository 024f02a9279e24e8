//! Type definitions for the agent client
//!
//! This module contains all the type definitions used throughout the crate,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Opaque id wrappers (`SessionStateToken`, `HistoryId`, `RunId`)
//! - [`events`] - Streaming event shapes
//! - [`session`] - Session, step and live-buffer model
//! - [`sql`] - Result sets and direct SQL execution
//! - [`request`] - Request bodies
//! - [`history`] - Query history entries
//! - [`options`] - Client configuration

pub mod events;
pub mod history;
pub mod identifiers;
pub mod options;
pub mod request;
pub mod session;
pub mod sql;

// Re-export commonly used types
pub use events::{AgentEvent, FormatEvent};
pub use history::{HistoryEntry, HistoryPage};
pub use identifiers::{HistoryId, RunId, SessionStateToken};
pub use options::{ClientOptions, ClientOptionsBuilder, DecodePolicy, Endpoints};
pub use request::{FormatRequest, QueryDefaults, ReactRequest};
pub use session::{
    AgentResponse, LiveStepBuffer, MetadataKind, Phase, Session, SessionStatus, SqlCompleteness,
    Step, ToolCall,
};
pub use sql::{ResultSet, SqlExecution, SqlRequest};
