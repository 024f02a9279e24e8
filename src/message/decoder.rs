//! Newline-delimited JSON decoding
//!
//! The agent service streams one JSON object per line. [`NdjsonDecoder`] is a
//! `tokio_util` codec that splits the body on `\n`, skips blank lines, and
//! turns each line into a typed event. Lines that do not parse are dropped
//! under [`DecodePolicy::Lenient`] and fail the stream under
//! [`DecodePolicy::Strict`].

use std::cmp;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::{Buf, Bytes, BytesMut};
use futures::Stream;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

use super::parser::parse_line;
use crate::error::{AgentError, Result};
use crate::types::options::{DEFAULT_MAX_LINE_BYTES, DecodePolicy};

/// Raw response body as delivered by a transport
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Lazy, non-restartable stream of decoded events
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Result<E>> + Send>>;

/// Codec turning NDJSON lines into events of type `E`
#[derive(Debug)]
pub struct NdjsonDecoder<E> {
    max_line_bytes: usize,
    policy: DecodePolicy,
    /// Bytes of the current line already scanned for a newline
    next_index: usize,
    /// Inside an oversized line, skipping to the next newline
    discarding: bool,
    dropped: usize,
    _event: PhantomData<fn() -> E>,
}

impl<E> NdjsonDecoder<E> {
    /// Create a decoder
    #[must_use]
    pub const fn new(max_line_bytes: usize, policy: DecodePolicy) -> Self {
        Self {
            max_line_bytes,
            policy,
            next_index: 0,
            discarding: false,
            dropped: 0,
            _event: PhantomData,
        }
    }

    /// Number of lines dropped so far
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<E> Default for NdjsonDecoder<E> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES, DecodePolicy::Lenient)
    }
}

impl<E: DeserializeOwned> NdjsonDecoder<E> {
    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<E>> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let parsed = match std::str::from_utf8(raw) {
            Ok(line) if line.trim().is_empty() => return Ok(None),
            Ok(line) => parse_line(line.trim()),
            Err(e) => Err(AgentError::message_parse(
                format!("Stream line is not UTF-8: {e}"),
                None,
            )),
        };
        match parsed {
            Ok(event) => Ok(Some(event)),
            Err(e) => self.reject(e),
        }
    }

    fn reject(&mut self, err: AgentError) -> Result<Option<E>> {
        match self.policy {
            DecodePolicy::Strict => Err(err),
            DecodePolicy::Lenient => {
                self.dropped += 1;
                log::warn!("Dropping malformed stream line: {err}");
                Ok(None)
            }
        }
    }
}

impl<E: DeserializeOwned> Decoder for NdjsonDecoder<E> {
    type Item = E;
    type Error = AgentError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<E>> {
        loop {
            let read_to = cmp::min(self.max_line_bytes.saturating_add(1), buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(end + 1);
                    if let Some(event) = self.decode_line(&line[..end])? {
                        return Ok(Some(event));
                    }
                }
                (false, None) if buf.len() > self.max_line_bytes => {
                    let err = AgentError::message_parse(
                        format!(
                            "Stream line exceeded maximum length of {} bytes",
                            self.max_line_bytes
                        ),
                        None,
                    );
                    self.reject(err)?;
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<E>> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            buf.clear();
            return Ok(None);
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Final line without a trailing newline
        let line = buf.split_to(buf.len());
        self.decode_line(&line)
    }
}

/// Decode a response body into a stream of events
///
/// The returned stream yields one item per well-formed line and ends when the
/// body ends. I/O failures of the body surface as `AgentError::Io`.
pub fn decode_stream<E>(body: ByteStream, decoder: NdjsonDecoder<E>) -> EventStream<E>
where
    E: DeserializeOwned + Send + 'static,
{
    Box::pin(FramedRead::new(StreamReader::new(body), decoder))
}
