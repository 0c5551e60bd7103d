//! sitemig Symbol System
//!
//! Binds the symbolic keys used in a migration document to the identities
//! the remote platform assigns on create.
//!
//! # Overview
//!
//! The symbol system provides:
//! - **Aliases**: normalized `nn` declarations (one or many aliases, one entity)
//! - **SymbolTable**: grow-only alias -> identity map with duplicate detection
//! - **GeneratedNames**: declared field name -> generated concrete name
//! - **AuditLog**: delimited per-run record of every binding
//!
//! # Example
//!
//! ```rust
//! use sitemig_symbol::{Aliases, EntityKind, RemoteId, SymbolTable};
//!
//! let table = SymbolTable::new();
//! let aliases = Aliases::new(["client:anna", "client:17"]).unwrap();
//! table.define(&aliases, &RemoteId::new("c-9"), EntityKind::Client).unwrap();
//!
//! assert_eq!(table.resolve("client:17").unwrap(), RemoteId::new("c-9"));
//! ```

#![warn(missing_docs)]

pub mod audit;
pub mod names;
pub mod symbol;
pub mod table;

// Re-exports
pub use audit::{AuditError, AuditLog};
pub use names::{needs_fresh_name, GeneratedNames, FRESH_NAME_MARKER};
pub use symbol::{Aliases, EntityKind, RemoteId, SymbolError};
pub use table::{SymbolEntry, SymbolTable};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for symbol operations
    pub use crate::{Aliases, AuditLog, EntityKind, RemoteId, SymbolError, SymbolTable};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
