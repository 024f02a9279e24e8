//! `QueryRunner` - drives one interactive session
//!
//! The runner enforces the one-stream-per-session rule: asking a new
//! question, answering a clarification, or cancelling always aborts the
//! stream that is currently being consumed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::tasks::{RunContext, consume_stream};
use crate::error::{AgentError, Result};
use crate::session::{Applied, Generation, SessionHandle};
use crate::transport::{HttpTransport, Transport};
use crate::types::identifiers::RunId;
use crate::types::request::ReactRequest;
use crate::types::session::Session;

/// Stream consumer currently attached to the session
struct ActiveRun {
    run_id: RunId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Runner for natural-language queries against one session
pub struct QueryRunner<T: Transport = HttpTransport> {
    client: Arc<super::AgentClient<T>>,
    handle: SessionHandle,
    active: Option<ActiveRun>,
}

impl<T: Transport> QueryRunner<T> {
    /// Create a runner with a fresh session
    #[must_use]
    pub fn new(client: Arc<super::AgentClient<T>>) -> Self {
        Self::with_handle(client, SessionHandle::new())
    }

    /// Create a runner driving an existing session handle
    #[must_use]
    pub fn with_handle(client: Arc<super::AgentClient<T>>, handle: SessionHandle) -> Self {
        Self {
            client,
            handle,
            active: None,
        }
    }

    /// Session handle, for observers
    #[must_use]
    pub const fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Client used by this runner
    #[must_use]
    pub const fn client(&self) -> &Arc<super::AgentClient<T>> {
        &self.client
    }

    /// Submit a new question
    ///
    /// Any previous run is aborted and its remaining events are discarded.
    /// Must be called from within a tokio runtime.
    pub fn ask(&mut self, question: &str) -> RunId {
        self.abort_active();
        let generation = self.handle.begin(question);
        let request = ReactRequest::new(question)
            .with_defaults(self.client.options().query_defaults.clone());
        self.spawn(generation, request)
    }

    /// Answer the agent's clarifying question and resume the session
    ///
    /// The new request carries the prior `session_state` token and the answer.
    ///
    /// # Errors
    /// Returns `AgentError::InvalidState` unless the agent is waiting for input
    pub fn answer(&mut self, answer: &str) -> Result<RunId> {
        let (generation, request) = self
            .handle
            .submit_answer(answer, self.client.options().query_defaults.clone())?;
        self.abort_active();
        Ok(self.spawn(generation, request))
    }

    /// Cancel the active run
    ///
    /// Aborts the request, stops applying events, and leaves the session in
    /// the `cancelled` status.
    pub fn cancel(&mut self) -> Applied {
        self.abort_active();
        let applied = self.handle.cancel();
        if applied.changed() {
            log::info!("Run cancelled by user");
        }
        applied
    }

    /// Drop the session and any active run
    pub fn clear(&mut self) {
        self.abort_active();
        self.handle.clear();
    }

    /// Whether a consumer task is still running
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.task.is_finished())
    }

    /// Wait for the active run's stream to end and return the session
    ///
    /// Returns immediately with the current session if nothing is running.
    ///
    /// # Errors
    /// Returns error if the consumer task panicked
    pub async fn wait(&mut self) -> Result<Session> {
        if let Some(run) = self.active.take() {
            run.task.await.map_err(|e| {
                AgentError::invalid_state(format!("run {} task failed: {e}", run.run_id))
            })?;
        }
        Ok(self.handle.snapshot())
    }

    fn spawn(&mut self, generation: Generation, request: ReactRequest) -> RunId {
        let run_id = RunId::new();
        let token = CancellationToken::new();
        log::info!("[{run_id}] Starting run for question: {}", request.question);

        let task = tokio::spawn(consume_stream(RunContext {
            client: Arc::clone(&self.client),
            handle: self.handle.clone(),
            generation,
            request,
            token: token.clone(),
            run_id,
        }));

        self.active = Some(ActiveRun {
            run_id,
            token,
            task,
        });
        run_id
    }

    fn abort_active(&mut self) {
        if let Some(run) = self.active.take() {
            log::debug!("[{}] Aborting run", run.run_id);
            run.token.cancel();
        }
    }
}

impl<T: Transport> Drop for QueryRunner<T> {
    fn drop(&mut self) {
        self.abort_active();
    }
}
