//! Run configuration loaded from TOML
//!
//! ```toml
//! facility_id = "f-123"
//! input = "export.json"
//! audit_dir = "audit"
//! skip_data = false
//!
//! [api]
//! base_url = "https://api.example.com/v1"
//! timeout_secs = 30
//!
//! [retry]
//! max_attempts = 5
//! delay_ms = 2000
//! ```
//!
//! Relative paths are taken relative to the config file. A missing
//! `api.token` falls back to the `SITEMIG_API_TOKEN` environment variable.

use anyhow::{Context, Result};
use serde::Deserialize;
use sitemig_core::{ExecutorConfig, MigrationDocument};
use sitemig_gateway::{Backoff, HttpConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when the config has no token
pub const TOKEN_ENV: &str = "SITEMIG_API_TOKEN";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    pub facility_id: String,
    /// Input document (JSON)
    pub input: PathBuf,
    /// Directory for the audit log; absent disables it
    #[serde(default)]
    pub audit_dir: Option<PathBuf>,
    #[serde(default)]
    pub skip_data: bool,
    pub api: HttpConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// `[retry]` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 2000,
        }
    }
}

impl MigrationConfig {
    /// Read and parse the config file at `path`
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config =
            Self::parse(&raw, base).with_context(|| format!("parsing config {}", path.display()))?;

        if config.api.token.is_none() {
            config.api.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        }
        Ok(config)
    }

    /// Parse TOML, resolving relative paths against `base`
    ///
    /// # Errors
    /// Returns the TOML error for malformed input
    pub fn parse(raw: &str, base: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.input = base.join(&config.input);
        config.audit_dir = config.audit_dir.map(|dir| base.join(dir));
        Ok(config)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Backoff::Fixed(Duration::from_millis(self.retry.delay_ms)),
        )
    }

    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new().with_skip_data(self.skip_data)
    }

    /// Read and parse the input document
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid document
    pub fn load_document(&self) -> Result<MigrationDocument> {
        let raw = std::fs::read_to_string(&self.input)
            .with_context(|| format!("reading input document {}", self.input.display()))?;
        MigrationDocument::from_json(&raw).with_context(|| format!("parsing input document {}", self.input.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
        facility_id = "f-1"
        input = "export.json"

        [api]
        base_url = "https://api.example.com/v1"
    "#;

    #[test]
    fn defaults_apply() {
        let config = MigrationConfig::parse(MINIMAL, Path::new("/etc/sitemig")).unwrap();

        assert_eq!(config.input, PathBuf::from("/etc/sitemig/export.json"));
        assert_eq!(config.audit_dir, None);
        assert!(!config.skip_data);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.retry_policy().max_attempts(), 5);
        assert_eq!(config.retry_policy().delay_after(1), Duration::from_secs(2));
    }

    #[test]
    fn full_config() {
        let raw = r#"
            facility_id = "f-2"
            input = "/data/export.json"
            audit_dir = "audit"
            skip_data = true

            [api]
            base_url = "https://api.example.com/v1"
            token = "secret"
            timeout_secs = 5

            [retry]
            max_attempts = 3
            delay_ms = 10
        "#;
        let config = MigrationConfig::parse(raw, Path::new("/work")).unwrap();

        assert_eq!(config.input, PathBuf::from("/data/export.json"));
        assert_eq!(config.audit_dir, Some(PathBuf::from("/work/audit")));
        assert!(config.executor_config().skip_data);
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.retry_policy().max_attempts(), 3);
        assert_eq!(config.retry_policy().delay_after(2), Duration::from_millis(10));
    }

    #[test]
    fn missing_facility_is_rejected() {
        let raw = "input = \"x.json\"\n[api]\nbase_url = \"http://localhost\"\n";
        assert!(MigrationConfig::parse(raw, Path::new(".")).is_err());
    }

    #[test]
    fn load_reads_document_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("export.json"), r#"{"clients": [{"nn": "c1"}]}"#).unwrap();
        let path = dir.path().join("sitemig.toml");
        std::fs::write(&path, MINIMAL.replace("https://api.example.com/v1", "http://localhost")).unwrap();

        let config = MigrationConfig::load(&path).unwrap();
        let document = config.load_document().unwrap();
        assert_eq!(document.summary().clients, 1);
    }
}
