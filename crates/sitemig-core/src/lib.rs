//! sitemig Core - migration execution engine
//!
//! Replays an exported [`MigrationDocument`] against a target facility:
//! - Creates schema (dictionaries, positions, attributes) in declared order
//! - Resolves symbolic references to identities created earlier in the run
//! - Computes relative orders against the live sibling listing
//! - Creates and links domain entities (staff, clients, groups, meetings)
//! - Stops at the first failure with a partial, inspectable report
//!
//! # Example
//!
//! ```rust,ignore
//! use sitemig_core::{MigrationDocument, MigrationExecutor};
//! use sitemig_gateway::Gateway;
//! use sitemig_symbol::SymbolTable;
//! use std::sync::Arc;
//!
//! # async fn example(gateway: Gateway, input: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let document = MigrationDocument::from_json(input)?;
//! let executor = MigrationExecutor::new(gateway, Arc::new(SymbolTable::new()));
//!
//! let report = executor.run(&document).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod document;
pub mod error;
pub mod executor;
pub mod order;
pub mod progress;
pub mod resolve;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use document::{
    Attendant, AttributeValue, ClientGroupSpec, ClientPatch, ClientSpec, CreateAttribute, CreateDictionary,
    DocumentSummary, ExtendDictionary, FieldMap, MeetingSpec, MetaOverride, MigrationDocument, OrderSpec,
    PositionRef, PositionSpec, PreseedEntry, SchemaAction, StaffSpec, SymbolRef,
};
pub use error::MigrationError;
pub use executor::MigrationExecutor;
pub use order::resolve_order;
pub use progress::ProgressTracker;
pub use resolve::ReferenceResolver;
pub use state::{allowed_transitions, validate_transition, ActionState};
pub use types::{ActionLabel, ActionRecord, ExecutorConfig, PhaseStats, RunFailure, RunReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running migrations
    pub use crate::{
        ExecutorConfig, MigrationDocument, MigrationError, MigrationExecutor, RunFailure, RunReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
