//! Session state reducer
//!
//! Pure state transitions: one [`AgentEvent`] in, one updated [`Session`]
//! out. No I/O happens here; the runner feeds events in arrival order.
//!
//! ```text
//! idle ──start──▶ running ──completed──────▶ completed
//!                    │ ▲  ──error──────────▶ error
//!                    │ │  ──cancel─────────▶ cancelled
//!                    │ └──(answer + next event)──┐
//!                    └──needs_user_input──▶ needs_user_input
//! ```

use crate::error::{AgentError, Result};
use crate::types::events::AgentEvent;
use crate::types::identifiers::SessionStateToken;
use crate::types::session::{AgentResponse, Session, SessionStatus};

/// Message recorded when an `error` event carries none
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Outcome of feeding one event or action to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The session changed
    Changed,
    /// The event was valid but not applicable in the current status
    Ignored,
    /// The event belongs to a run that is no longer current
    Stale,
}

impl Applied {
    /// Whether the session changed
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

impl Session {
    /// Start a new run for `question`, discarding any previous state
    pub fn start(&mut self, question: impl Into<String>) {
        *self = Self {
            question: question.into(),
            status: SessionStatus::Running,
            ..Self::default()
        };
    }

    /// Apply one stream event
    ///
    /// Events for a given iteration must arrive in stream order: section
    /// deltas always append.
    pub fn apply(&mut self, event: AgentEvent) -> Applied {
        if !self.admits(&event) {
            log::trace!("Ignoring {} event in status {}", event.kind(), self.status);
            return Applied::Ignored;
        }
        // The first event of a resumed stream switches back to running, even
        // when the event itself is dropped below
        let resumed =
            self.status == SessionStatus::NeedsUserInput && self.pending_answer.is_some();
        if resumed {
            self.resume_running();
        }

        let applied = self.dispatch(event);
        if resumed { Applied::Changed } else { applied }
    }

    fn dispatch(&mut self, event: AgentEvent) -> Applied {
        match event {
            AgentEvent::Token { token, .. } => {
                self.raw_stream.push_str(&token);
                Applied::Changed
            }
            AgentEvent::SectionDelta {
                iteration,
                section,
                delta,
            } => self.with_live(iteration, |live| {
                live.sections.entry(section).or_default().push_str(&delta);
            }),
            AgentEvent::MetadataItem {
                iteration,
                item_type,
                item,
            } => self.with_live(iteration, |live| {
                live.metadata.entry(item_type).or_default().push(item);
            }),
            AgentEvent::FormatRepair { iteration, reason } => self.with_live(iteration, |live| {
                live.is_repairing = true;
                if reason.is_some() {
                    live.repair_reason = reason;
                }
            }),
            AgentEvent::Phase {
                phase,
                iteration,
                data,
                state,
            } => {
                self.record_state(state);
                let iteration = iteration.unwrap_or(self.current_iteration);
                self.current_iteration = self.current_iteration.max(iteration);
                self.current_phase = Some(phase.clone());
                if self.step(iteration).is_none() {
                    let live = self.live_by_iteration.entry(iteration).or_default();
                    live.phase = Some(phase);
                    if !data.is_null() {
                        live.phase_data = Some(data);
                    }
                }
                Applied::Changed
            }
            AgentEvent::Step { step, state } => {
                self.record_state(state);
                let iteration = step.iteration;
                self.current_iteration = self.current_iteration.max(iteration);
                match self.steps.binary_search_by_key(&iteration, |s| s.iteration) {
                    Ok(idx) => self.steps[idx] = step,
                    Err(idx) => self.steps.insert(idx, step),
                }
                self.live_by_iteration.remove(&iteration);
                Applied::Changed
            }
            AgentEvent::Completed { response, state } => {
                self.record_state(state);
                self.complete(response);
                Applied::Changed
            }
            AgentEvent::NeedsUserInput { response, state } => {
                self.record_state(state);
                self.status = SessionStatus::NeedsUserInput;
                self.question_to_user = response.question_to_user.clone();
                self.pending_answer = None;
                if response.final_sql.is_some() {
                    self.final_sql.clone_from(&response.final_sql);
                }
                self.warnings.clone_from(&response.warnings);
                self.response = Some(response);
                Applied::Changed
            }
            AgentEvent::Error { message } => {
                self.status = SessionStatus::Error;
                self.error = Some(message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()));
                Applied::Changed
            }
        }
    }

    /// Cancel the run on behalf of the user
    ///
    /// Only a running or paused session can be cancelled.
    pub fn cancel(&mut self) -> Applied {
        match self.status {
            SessionStatus::Running | SessionStatus::NeedsUserInput => {
                self.status = SessionStatus::Cancelled;
                self.pending_answer = None;
                Applied::Changed
            }
            _ => Applied::Ignored,
        }
    }

    /// Fail the run with a client-side error (transport, decode)
    pub fn fail(&mut self, message: impl Into<String>) -> Applied {
        match self.status {
            SessionStatus::Running | SessionStatus::NeedsUserInput => {
                self.status = SessionStatus::Error;
                self.error = Some(message.into());
                self.pending_answer = None;
                Applied::Changed
            }
            _ => Applied::Ignored,
        }
    }

    /// Record the user's answer to the agent's question
    ///
    /// The session stays in `needs_user_input` until the resumed stream
    /// delivers its first event.
    ///
    /// # Errors
    /// Returns `AgentError::InvalidState` unless the agent is waiting for input
    pub fn submit_answer(&mut self, answer: impl Into<String>) -> Result<()> {
        if self.status != SessionStatus::NeedsUserInput {
            return Err(AgentError::invalid_state(format!(
                "cannot answer a session in status {}",
                self.status
            )));
        }
        self.pending_answer = Some(answer.into());
        Ok(())
    }

    fn admits(&self, event: &AgentEvent) -> bool {
        match self.status {
            SessionStatus::Running => true,
            SessionStatus::NeedsUserInput => {
                self.pending_answer.is_some()
                    || matches!(
                        event,
                        AgentEvent::Error { .. } | AgentEvent::NeedsUserInput { .. }
                    )
            }
            SessionStatus::Completed => matches!(event, AgentEvent::Completed { .. }),
            SessionStatus::Idle | SessionStatus::Error | SessionStatus::Cancelled => false,
        }
    }

    fn resume_running(&mut self) {
        self.status = SessionStatus::Running;
        self.question_to_user = None;
        self.pending_answer = None;
    }

    fn complete(&mut self, response: AgentResponse) {
        self.status = SessionStatus::Completed;
        self.final_sql.clone_from(&response.final_sql);
        self.validated_sql.clone_from(&response.validated_sql);
        self.execution_result.clone_from(&response.execution_result);
        self.warnings.clone_from(&response.warnings);
        self.question_to_user = None;
        self.response = Some(response);
    }

    fn record_state(&mut self, state: Option<SessionStateToken>) {
        if let Some(state) = state
            && !state.is_null()
        {
            self.session_state = Some(state);
        }
    }

    /// Run `f` on the live buffer of a step that has not been finalized
    fn with_live(
        &mut self,
        iteration: u32,
        f: impl FnOnce(&mut crate::types::session::LiveStepBuffer),
    ) -> Applied {
        if self.step(iteration).is_some() {
            log::debug!("Iteration {iteration} already finalized, dropping live update");
            return Applied::Ignored;
        }
        self.current_iteration = self.current_iteration.max(iteration);
        f(self.live_by_iteration.entry(iteration).or_default());
        Applied::Changed
    }
}
