//! Error types for the migration engine
//!
//! Every variant is fatal to the run. The classification helpers exist for
//! reporting, not for recovery:
//! - reference errors: the document points at something that does not exist
//! - transient errors: the retry budget ran out
//! - everything else: the remote side or the caller's rights said no

use crate::state::ActionState;
use sitemig_gateway::GatewayError;
use sitemig_symbol::SymbolError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Duplicate key or unresolved reference
    #[error("symbol error: {0}")]
    Symbol(#[from] SymbolError),

    /// No dictionary with this alias or display name
    #[error("dictionary not found: '{reference}'")]
    DictionaryNotFound { reference: String },

    /// No position with this name or alias in the dictionary
    #[error("position '{position}' not found in dictionary '{dictionary}'")]
    PositionNotFound { dictionary: String, position: String },

    /// No attribute with this alias, name or declared field
    #[error("attribute not found: '{reference}'")]
    AttributeNotFound { reference: String },

    /// Pre-existing staff member could not be located
    #[error("no existing staff member with email '{email}'")]
    StaffNotFound { email: String },

    /// Remote call failed
    #[error("remote call failed: {0}")]
    Gateway(#[from] GatewayError),

    /// Caller lacks rights on the target facility
    #[error("insufficient permissions: {0}")]
    Permission(String),

    /// Internal bookkeeping went out of order
    #[error("illegal action state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ActionState, to: ActionState },
}

impl MigrationError {
    /// Whether the document referenced something that does not exist
    #[inline]
    #[must_use]
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            Self::Symbol(_)
                | Self::DictionaryNotFound { .. }
                | Self::PositionNotFound { .. }
                | Self::AttributeNotFound { .. }
                | Self::StaffNotFound { .. }
        )
    }

    /// Whether the run stopped because transient retries ran out
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_transient())
    }
}
