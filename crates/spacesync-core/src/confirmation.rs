//! Preview confirmation state machine.
//!
//! `Previewing` moves to exactly one of `Confirmed`, `Cancelled` or
//! `TimedOut`. Only the operator who requested the preview may act; anyone
//! else is rejected without a state change. Terminal states reject every
//! further event, so a confirmation is used once.

use serde::{Deserialize, Serialize};

use crate::core_types::OperatorId;
use crate::errors::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    Previewing,
    Confirmed,
    Cancelled,
    TimedOut,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Previewing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationState::Previewing => "previewing",
            ConfirmationState::Confirmed => "confirmed",
            ConfirmationState::Cancelled => "cancelled",
            ConfirmationState::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfirmationEvent {
    Accept { actor: OperatorId },
    Cancel { actor: OperatorId },
    Timeout,
}

impl ConfirmationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationEvent::Accept { .. } => "accept",
            ConfirmationEvent::Cancel { .. } => "cancel",
            ConfirmationEvent::Timeout => "timeout",
        }
    }
}

/// What the driver must do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Acknowledge the long-running work, then invoke apply
    DeferAndApply,
    AnnounceCancelled,
    AnnounceTimedOut,
    /// Tell `actor` they cannot act on this preview; state unchanged
    RejectActor { actor: OperatorId },
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    operator: OperatorId,
    state: ConfirmationState,
}

impl Confirmation {
    pub fn new(operator: OperatorId) -> Self {
        Self {
            operator,
            state: ConfirmationState::Previewing,
        }
    }

    pub fn operator(&self) -> OperatorId {
        self.operator
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    pub fn handle(&mut self, event: ConfirmationEvent) -> Result<NextAction> {
        if self.state.is_terminal() {
            return Err(SyncError::InvalidTransition {
                state: self.state.as_str().to_string(),
                event: event.as_str().to_string(),
            });
        }

        let action = match event {
            ConfirmationEvent::Accept { actor } | ConfirmationEvent::Cancel { actor }
                if actor != self.operator =>
            {
                NextAction::RejectActor { actor }
            }
            ConfirmationEvent::Accept { .. } => {
                self.state = ConfirmationState::Confirmed;
                NextAction::DeferAndApply
            }
            ConfirmationEvent::Cancel { .. } => {
                self.state = ConfirmationState::Cancelled;
                NextAction::AnnounceCancelled
            }
            ConfirmationEvent::Timeout => {
                self.state = ConfirmationState::TimedOut;
                NextAction::AnnounceTimedOut
            }
        };
        Ok(action)
    }
}
