//! Symbol table
//!
//! Provides [`SymbolTable`], the run-scoped map from alias to remote
//! identity. The table only grows: every alias is bound at most once, and
//! rebinding to a different identity is a fatal [`SymbolError::DuplicateKey`].

use crate::audit::AuditLog;
use crate::names::GeneratedNames;
use crate::symbol::{Aliases, EntityKind, RemoteId, SymbolError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

/// Bound identity plus the kind it was registered as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Remote identity
    pub id: RemoteId,
    /// Entity kind
    pub kind: EntityKind,
}

/// Run-scoped alias table
///
/// Thread-safe so it can be shared as `Arc<SymbolTable>`, although a
/// migration run only ever touches it from one task.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: RwLock<HashMap<String, SymbolEntry>>,
    names: GeneratedNames,
    audit: Option<Mutex<AuditLog>>,
}

impl SymbolTable {
    /// Create an empty table without an audit log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table that records every binding to `audit`
    #[must_use]
    pub fn with_audit(audit: AuditLog) -> Self {
        Self {
            audit: Some(Mutex::new(audit)),
            ..Self::default()
        }
    }

    /// Bind every alias to `id`
    ///
    /// Aliases already bound to the same identity are left alone. All aliases
    /// are checked before any is inserted, so a failed call leaves the table
    /// unchanged.
    ///
    /// # Errors
    /// Returns [`SymbolError::DuplicateKey`] if an alias is bound elsewhere
    pub fn define(&self, aliases: &Aliases, id: &RemoteId, kind: EntityKind) -> Result<(), SymbolError> {
        let mut entries = self.entries.write();

        for alias in aliases.iter() {
            if let Some(existing) = entries.get(alias) {
                if existing.id != *id {
                    return Err(SymbolError::DuplicateKey {
                        alias: alias.to_string(),
                        existing: existing.id.clone(),
                        attempted: id.clone(),
                    });
                }
            }
        }

        let mut fresh = Vec::new();
        for alias in aliases.iter() {
            if !entries.contains_key(alias) {
                entries.insert(
                    alias.to_string(),
                    SymbolEntry {
                        id: id.clone(),
                        kind,
                    },
                );
                fresh.push(alias);
            }
        }
        drop(entries);

        tracing::debug!(aliases = %aliases, id = %id, kind = %kind, "symbol defined");
        if let Some(audit) = &self.audit {
            let mut audit = audit.lock();
            for alias in fresh {
                if let Err(e) = audit.record(alias, id, kind) {
                    tracing::warn!(alias, error = %e, "audit log write failed");
                }
            }
        }
        Ok(())
    }

    /// Whether `alias` is bound
    #[must_use]
    pub fn has(&self, alias: &str) -> bool {
        self.entries.read().contains_key(alias)
    }

    /// Identity bound to `alias`
    ///
    /// # Errors
    /// Returns [`SymbolError::UnresolvedReference`] if the alias is unbound
    pub fn resolve(&self, alias: &str) -> Result<RemoteId, SymbolError> {
        self.entries
            .read()
            .get(alias)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| SymbolError::UnresolvedReference {
                alias: alias.to_string(),
            })
    }

    /// Identity bound to `alias`, if any
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<SymbolEntry> {
        self.entries.read().get(alias).cloned()
    }

    /// Kind of entity `alias` is bound to, if any
    #[must_use]
    pub fn kind_of(&self, alias: &str) -> Option<EntityKind> {
        self.entries.read().get(alias).map(|entry| entry.kind)
    }

    /// Number of bound aliases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is bound yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all bindings, sorted by alias
    #[must_use]
    pub fn entries(&self) -> Vec<(String, SymbolEntry)> {
        let mut out: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(alias, entry)| (alias.clone(), entry.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Generated field names for this run
    #[inline]
    #[must_use]
    pub fn names(&self) -> &GeneratedNames {
        &self.names
    }

    /// Path of the attached audit log, if any
    #[must_use]
    pub fn audit_path(&self) -> Option<std::path::PathBuf> {
        self.audit.as_ref().map(|a| a.lock().path().to_path_buf())
    }
}
