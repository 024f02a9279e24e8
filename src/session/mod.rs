//! Session state and observation
//!
//! [`Session`](crate::types::session::Session) values are plain data; this
//! module adds the reducer that mutates them and a [`SessionHandle`] that
//! shares one session between a single writer (the stream consumer) and any
//! number of readers.
//!
//! # Observing a session
//!
//! ```no_run
//! use text2sql_agent::session::SessionHandle;
//!
//! # async fn example(handle: SessionHandle) {
//! let mut watcher = handle.subscribe();
//! while watcher.changed().await {
//!     let Some(session) = watcher.snapshot() else { break };
//!     log::info!("{} at iteration {}", session.status, session.current_iteration);
//!     if session.status.is_terminal() {
//!         break;
//!     }
//! }
//! # }
//! ```
//!
//! Every mutation bumps a revision counter published on a `watch` channel.
//! Readers pull the latest snapshot; intermediate revisions may be skipped.
//!
//! Each run gets a generation number. Events are applied only if they carry
//! the current generation, so a stream that outlived its run (superseded by
//! a new question or cancelled) can never touch the session again.

pub mod format;
pub mod reducer;

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::Result;
use crate::types::events::AgentEvent;
use crate::types::request::{QueryDefaults, ReactRequest};
use crate::types::session::{Session, SessionStatus};

pub use format::{FormatSession, FormatStage};
pub use reducer::Applied;

/// Run generation number
pub type Generation = u64;

struct State {
    session: Session,
    generation: Generation,
}

struct Shared {
    state: RwLock<State>,
    revision_tx: watch::Sender<u64>,
}

/// Shared handle to one session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Shared>,
}

impl SessionHandle {
    /// Create a handle around an idle session
    #[must_use]
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Shared {
                state: RwLock::new(State {
                    session: Session::new(),
                    generation: 0,
                }),
                revision_tx,
            }),
        }
    }

    /// Clone the current session
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.read().session.clone()
    }

    /// Read the session without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.inner.state.read().session)
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.read(|s| s.status)
    }

    /// Current run generation
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.inner.state.read().generation
    }

    /// Subscribe to state-changed notifications
    #[must_use]
    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.inner.revision_tx.subscribe(),
            shared: Arc::downgrade(&self.inner),
        }
    }

    /// Start a new run, superseding any previous one
    pub fn begin(&self, question: &str) -> Generation {
        let generation = self.mutate(|state| {
            state.generation += 1;
            state.session.start(question);
            state.generation
        });
        log::debug!("Session run {generation} started");
        generation
    }

    /// Apply an event belonging to run `generation`
    pub fn apply(&self, generation: Generation, event: AgentEvent) -> Applied {
        self.guarded(generation, |session| session.apply(event))
    }

    /// Fail run `generation` with a client-side error
    pub fn fail(&self, generation: Generation, message: impl Into<String>) -> Applied {
        let message = message.into();
        self.guarded(generation, |session| session.fail(message))
    }

    /// Mark run `generation` as ended by the server closing the stream
    ///
    /// A stream that closes while the session is still running, or before a
    /// resumed run delivered its first event, never delivered a terminal
    /// event. Both are reported as errors.
    pub fn stream_closed(&self, generation: Generation) -> Applied {
        self.guarded(generation, |session| {
            let resuming = session.status == SessionStatus::NeedsUserInput
                && session.pending_answer.is_some();
            if session.status == SessionStatus::Running || resuming {
                session.fail("stream ended before the agent finished")
            } else {
                Applied::Ignored
            }
        })
    }

    /// Cancel the current run
    ///
    /// The generation moves on, so events still buffered for the cancelled
    /// run are rejected as stale.
    pub fn cancel(&self) -> Applied {
        self.mutate_if_changed(|state| {
            let applied = state.session.cancel();
            if applied.changed() {
                state.generation += 1;
            }
            applied
        })
    }

    /// Record an answer to the agent's question and build the resume request
    ///
    /// # Errors
    /// Returns `AgentError::InvalidState` unless the agent is waiting for input
    pub fn submit_answer(
        &self,
        answer: &str,
        defaults: QueryDefaults,
    ) -> Result<(Generation, ReactRequest)> {
        let result = {
            let mut state = self.inner.state.write();
            state.session.submit_answer(answer).map(|()| {
                state.generation += 1;
                let request = ReactRequest::new(state.session.question.clone())
                    .with_defaults(defaults)
                    .resume(state.session.session_state.clone(), answer);
                (state.generation, request)
            })
        };
        if result.is_ok() {
            self.notify();
        }
        result
    }

    /// Reset to an idle session, dropping any active run
    pub fn clear(&self) {
        self.mutate(|state| {
            state.generation += 1;
            state.session = Session::new();
        });
    }

    fn guarded(&self, generation: Generation, f: impl FnOnce(&mut Session) -> Applied) -> Applied {
        self.mutate_if_changed(|state| {
            if state.generation != generation {
                return Applied::Stale;
            }
            f(&mut state.session)
        })
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let result = f(&mut self.inner.state.write());
        self.notify();
        result
    }

    fn mutate_if_changed(&self, f: impl FnOnce(&mut State) -> Applied) -> Applied {
        let applied = f(&mut self.inner.state.write());
        if applied.changed() {
            self.notify();
        }
        applied
    }

    fn notify(&self) {
        self.inner.revision_tx.send_modify(|revision| *revision += 1);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("SessionHandle")
            .field("generation", &state.generation)
            .field("status", &state.session.status)
            .finish_non_exhaustive()
    }
}

/// Subscriber to a session's state-changed notifications
pub struct SessionWatcher {
    rx: watch::Receiver<u64>,
    shared: Weak<Shared>,
}

impl SessionWatcher {
    /// Wait for the next change
    ///
    /// Returns `false` once no handle to the session remains.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Revision counter seen by this watcher
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Clone the latest session, if any handle to it remains
    #[must_use]
    pub fn snapshot(&self) -> Option<Session> {
        let shared = self.shared.upgrade()?;
        let session = shared.state.read().session.clone();
        Some(session)
    }
}
