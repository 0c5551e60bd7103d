//! Append-only audit log of registered symbols
//!
//! One tab-separated line per alias: `alias`, `identity`, `kind`. Each run
//! writes a fresh file; lines are flushed as they are recorded so the file
//! reflects exactly what was registered if the run aborts.

use crate::symbol::{EntityKind, RemoteId};
use chrono::Utc;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Errors while writing the audit log
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Filesystem error
    #[error("audit log io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited writer error
    #[error("audit log write failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Delimited audit log writer
pub struct AuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("path", &self.path).finish_non_exhaustive()
    }
}

impl AuditLog {
    /// Create a timestamped log file inside `dir`
    ///
    /// The directory is created if missing.
    ///
    /// # Errors
    /// Returns [`AuditError::Io`] if the directory or file cannot be created
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| AuditError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = format!("sitemig-audit-{}.tsv", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        Self::create(dir.join(name))
    }

    /// Create (truncating) a log file at an explicit path
    ///
    /// # Errors
    /// Returns [`AuditError::Io`] if the file cannot be created
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| AuditError::Io {
            path: path.clone(),
            source,
        })?;
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    /// Append one line and flush it
    ///
    /// # Errors
    /// Returns an error if the line cannot be written or flushed
    pub fn record(&mut self, alias: &str, id: &RemoteId, kind: EntityKind) -> Result<(), AuditError> {
        self.writer.write_record([alias, id.as_str(), kind.as_str()])?;
        self.writer.flush().map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Location of the log file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_tab_separated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.tsv");
        let mut log = AuditLog::create(&path).unwrap();

        log.record("color:red", &RemoteId::new("p-1"), EntityKind::Position).unwrap();
        log.record("c1", &RemoteId::new("cl-9"), EntityKind::Client).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "color:red\tp-1\tposition\nc1\tcl-9\tclient\n");
    }

    #[test]
    fn create_in_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::create_in(dir.path().join("nested")).unwrap();

        let name = log.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sitemig-audit-"));
        assert!(name.ends_with(".tsv"));
        assert!(log.path().exists());
    }
}
