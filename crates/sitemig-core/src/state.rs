//! Per-action state machine
//!
//! `Pending -> Resolving -> Submitting -> Registered`, or `Failed` from
//! `Resolving`/`Submitting`. `Registered` and `Failed` are terminal.

use crate::error::MigrationError;
use serde::Serialize;

/// Lifecycle of one migration action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionState {
    Pending,
    Resolving,
    Submitting,
    Registered,
    Failed,
}

impl ActionState {
    /// Whether no further transition is allowed
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Registered | Self::Failed)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: ActionState) -> Vec<ActionState> {
    use ActionState::*;
    match from {
        Pending => vec![Resolving],
        Resolving => vec![Submitting, Registered, Failed],
        Submitting => vec![Registered, Failed],
        Registered | Failed => vec![],
    }
}

/// Validate a state transition
///
/// `Resolving -> Registered` covers actions that register without a create
/// call (pre-existing staff located by lookup).
///
/// # Errors
/// Returns [`MigrationError::InvalidTransition`] for any other move
pub fn validate_transition(from: ActionState, to: ActionState) -> Result<(), MigrationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MigrationError::InvalidTransition { from, to })
    }
}
