//! Testing utilities for sitemig workspace
//!
//! Shared fake platform, gateway wiring and document fixtures.

#![allow(missing_docs)]

pub mod fixtures;
mod platform;

pub use platform::{FakePlatform, StoredEntity};

use sitemig_gateway::{Gateway, RetryPolicy};
use std::sync::Arc;

/// Facility id used by every test gateway
pub const TEST_FACILITY: &str = "facility-test";

/// Gateway over `platform` with a five-attempt, zero-delay retry policy
#[must_use]
pub fn gateway_for(platform: &Arc<FakePlatform>) -> Gateway {
    Gateway::new(platform.clone(), TEST_FACILITY).with_retry(RetryPolicy::immediate(5))
}
