//! Confirmation driver.
//!
//! Feeds operator actions into the [`Confirmation`] state machine until it
//! reaches a terminal state, or the timeout fires first.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use spacesync_core::core_types::OperatorId;
use spacesync_core::{
    Confirmation, ConfirmationEvent, ConfirmationState, NextAction, Plan, Result,
};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::surface::SurfaceError;

/// Where the preview is shown and where the outcome is announced
#[async_trait]
pub trait ConfirmationSurface: Send + Sync {
    /// Present the preview and the accept/cancel controls to `operator`
    async fn show_preview(
        &self,
        operator: OperatorId,
        plan: &Plan,
        rendered: &str,
    ) -> std::result::Result<(), SurfaceError>;

    /// Tell someone other than the operator they cannot act
    async fn reject_actor(&self, actor: OperatorId);

    /// Accepted: acknowledge before the long-running apply starts
    async fn acknowledge(&self);

    /// Cancelled or timed out
    async fn announce(&self, state: ConfirmationState);
}

/// Drive `confirmation` until it is terminal.
///
/// A closed action channel cannot deliver a decision any more, so the driver
/// waits out the remaining timeout.
pub async fn await_decision(
    surface: &dyn ConfirmationSurface,
    confirmation: &mut Confirmation,
    actions: &mut mpsc::Receiver<ConfirmationEvent>,
    timeout: Duration,
) -> Result<ConfirmationState> {
    let deadline = Instant::now() + timeout;
    let mut open = true;

    while !confirmation.state().is_terminal() {
        let received = if open {
            tokio::select! {
                received = actions.recv() => received,
                _ = sleep_until(deadline) => Some(ConfirmationEvent::Timeout),
            }
        } else {
            sleep_until(deadline).await;
            Some(ConfirmationEvent::Timeout)
        };
        let Some(event) = received else {
            open = false;
            continue;
        };

        tracing::debug!(
            op = "confirmation",
            event_type = event.as_str(),
            state = confirmation.state().as_str(),
            "confirmation event"
        );
        match confirmation.handle(event)? {
            NextAction::DeferAndApply => surface.acknowledge().await,
            NextAction::AnnounceCancelled => surface.announce(ConfirmationState::Cancelled).await,
            NextAction::AnnounceTimedOut => surface.announce(ConfirmationState::TimedOut).await,
            NextAction::RejectActor { actor } => surface.reject_actor(actor).await,
        }
    }
    Ok(confirmation.state())
}

/// Something a [`RecordingConfirmation`] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationCall {
    Preview { operator: OperatorId, rendered: String },
    Reject { actor: OperatorId },
    Acknowledge,
    Announce { state: ConfirmationState },
}

/// Records every call in order
#[derive(Debug, Default)]
pub struct RecordingConfirmation {
    calls: Mutex<Vec<ConfirmationCall>>,
}

impl RecordingConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ConfirmationCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: ConfirmationCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ConfirmationSurface for RecordingConfirmation {
    async fn show_preview(
        &self,
        operator: OperatorId,
        _plan: &Plan,
        rendered: &str,
    ) -> std::result::Result<(), SurfaceError> {
        self.record(ConfirmationCall::Preview {
            operator,
            rendered: rendered.to_string(),
        });
        Ok(())
    }

    async fn reject_actor(&self, actor: OperatorId) {
        self.record(ConfirmationCall::Reject { actor });
    }

    async fn acknowledge(&self) {
        self.record(ConfirmationCall::Acknowledge);
    }

    async fn announce(&self, state: ConfirmationState) {
        self.record(ConfirmationCall::Announce { state });
    }
}
