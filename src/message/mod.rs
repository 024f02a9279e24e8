//! Stream decoding and event parsing
//!
//! - `decoder` - NDJSON codec over a streaming response body
//! - `parser` - JSON line to typed event conversion

pub mod decoder;
pub mod parser;

pub use decoder::{ByteStream, EventStream, NdjsonDecoder, decode_stream};
pub use parser::{parse_agent_event, parse_event, parse_format_event, parse_line};
