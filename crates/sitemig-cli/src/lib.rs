//! sitemig command-line driver
//!
//! Loads a TOML run configuration and the exported document, walks the
//! operator through two confirmation checkpoints and runs the migration.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod config;

pub use commands::{check, drive, run, Outcome, Prompt};
pub use config::{MigrationConfig, RetrySettings, TOKEN_ENV};

/// Install the global `tracing` subscriber
///
/// `level` wins over `RUST_LOG`; without either the filter is `info`.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
