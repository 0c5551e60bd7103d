//! sitemig Remote Gateway
//!
//! The only path to the target platform. Every call goes through a
//! [`Transport`]; the [`Gateway`] adds retry, envelope decoding and the
//! listing caches.
//!
//! # Architecture
//!
//! ```text
//! Gateway ──call──▶ RetryPolicy ──▶ Transport::send ──▶ HTTP
//!    │                                   │
//!    └── ListingCache (dictionaries,     └── { data | errors } envelope
//!        attributes), invalidated on
//!        matching mutations
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sitemig_gateway::{Gateway, HttpConfig, HttpTransport, RetryPolicy};
//! use std::sync::Arc;
//!
//! # async fn example(config: HttpConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let gateway = Gateway::new(transport, "facility-1").with_retry(RetryPolicy::default());
//! let dictionaries = gateway.dictionaries().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod model;
pub mod retry;
pub mod transport;

// Re-exports for convenience
pub use cache::ListingCache;
pub use error::{GatewayError, RemoteErrorDetail, TransportError};
pub use gateway::{Gateway, MutationKind};
pub use model::{
    Attribute, AttributeModel, AttributeType, Created, CreatedDictionary, Dictionary, EntityModel, MetaPayload,
    NewAttribute, NewDictionary, NewPosition, Permissions, Position, RecordCounts, StaffRecord,
};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{ApiRequest, HttpConfig, HttpTransport, Method, Transport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
