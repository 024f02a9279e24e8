//! Background tasks for `QueryRunner`
//!
//! This module contains the stream consumer that applies decoded events to
//! the session until the stream ends, fails, or the run is cancelled.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::session::{Applied, Generation, SessionHandle};
use crate::transport::Transport;
use crate::types::identifiers::RunId;
use crate::types::request::ReactRequest;

/// Everything one consumer task needs
pub(super) struct RunContext<T: Transport> {
    pub client: Arc<super::AgentClient<T>>,
    pub handle: SessionHandle,
    pub generation: Generation,
    pub request: ReactRequest,
    pub token: CancellationToken,
    pub run_id: RunId,
}

/// Stream consumer task - opens the stream and applies events in arrival order
///
/// Cancellation is checked before every event, so events already buffered in
/// the decoder are never applied once the token fires. Returning drops the
/// stream, which closes the underlying connection.
pub(super) async fn consume_stream<T: Transport>(ctx: RunContext<T>) {
    let RunContext {
        client,
        handle,
        generation,
        request,
        token,
        run_id,
    } = ctx;

    let opened = tokio::select! {
        () = token.cancelled() => {
            log::debug!("[{run_id}] Cancelled before the stream opened");
            return;
        }
        opened = client.stream_react(&request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("[{run_id}] Failed to open stream: {e}");
            handle.fail(generation, e.to_string());
            return;
        }
    };

    let mut applied_count = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                log::debug!("[{run_id}] Cancelled after {applied_count} events");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let kind = event.kind();
                match handle.apply(generation, event) {
                    Applied::Changed => applied_count += 1,
                    Applied::Ignored => log::debug!("[{run_id}] Ignored {kind} event"),
                    Applied::Stale => {
                        log::debug!("[{run_id}] Run superseded, closing stream");
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                log::error!("[{run_id}] Stream failed: {e}");
                handle.fail(generation, e.to_string());
                return;
            }
            None => {
                log::debug!("[{run_id}] Stream closed after {applied_count} events");
                handle.stream_closed(generation);
                return;
            }
        }
    }
}
