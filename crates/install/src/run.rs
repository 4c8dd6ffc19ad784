//! Run state machine and report bookkeeping

use ifw_errors::{Error, InstallError, Stage, UserFacingError};
use ifw_events::{EventEmitter, EventSender, LifecycleEvent};
use ifw_types::{FailureSummary, RunMode, RunReport, RunState, RunStatus};
use std::time::Instant;
use uuid::Uuid;

/// Tracks the state of one run and assembles its report
#[derive(Debug)]
pub(crate) struct RunTracker {
    state: RunState,
    started: Instant,
    report: RunReport,
    events: Option<EventSender>,
}

impl EventEmitter for RunTracker {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl RunTracker {
    pub(crate) fn new(mode: RunMode, events: Option<EventSender>) -> Self {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, %mode, "run started");
        Self {
            state: RunState::Idle,
            started: Instant::now(),
            report: RunReport::new(run_id, mode),
            events,
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.report.run_id
    }

    pub(crate) fn report_mut(&mut self) -> &mut RunReport {
        &mut self.report
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub(crate) fn advance(&mut self, next: RunState) -> Result<(), Error> {
        if !self.state.can_transition_to(next) {
            return Err(InstallError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        tracing::debug!(from = %self.state, to = %next, "state changed");
        self.emit_lifecycle(LifecycleEvent::StateChanged {
            from: self.state,
            to: next,
        });
        self.state = next;
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<RunReport, Error> {
        self.advance(RunState::Finished)?;
        Ok(self.close(RunStatus::Finished))
    }

    /// End in `Aborted` or `Failed` depending on the error
    pub(crate) fn fail(
        mut self,
        stage: Stage,
        component: Option<String>,
        operation: Option<String>,
        error: &Error,
    ) -> Result<RunReport, Error> {
        let (state, status) = if error.is_cancelled() {
            (RunState::Aborted, RunStatus::Canceled)
        } else {
            (RunState::Failed, RunStatus::Failed)
        };
        tracing::warn!(%stage, ?component, ?operation, error = %error, "run stopped");
        self.advance(state)?;
        self.report.failure = Some(FailureSummary {
            stage,
            component,
            operation,
            message: error.user_message().into_owned(),
            code: error.user_code().map(str::to_string),
        });
        Ok(self.close(status))
    }

    fn close(mut self, status: RunStatus) -> RunReport {
        self.report.status = status;
        self.report.duration_ms =
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.emit_lifecycle(LifecycleEvent::Finished { status });
        tracing::info!(run_id = %self.report.run_id, %status, "run finished");
        self.report
    }
}
