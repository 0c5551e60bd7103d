//! Generated field names
//!
//! An attribute declared with a field name ending in [`FRESH_NAME_MARKER`]
//! gets a concrete name with a unique suffix when it is created. Later
//! references to the declared name are substituted with the concrete one.

use crate::symbol::SymbolError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Trailing marker requesting a fresh unique suffix
pub const FRESH_NAME_MARKER: char = '$';

/// Whether `field` asks for a generated name
#[inline]
#[must_use]
pub fn needs_fresh_name(field: &str) -> bool {
    field.ends_with(FRESH_NAME_MARKER)
}

/// Declared name -> generated concrete name
#[derive(Debug, Default)]
pub struct GeneratedNames {
    inner: RwLock<HashMap<String, String>>,
}

impl GeneratedNames {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and record a concrete name for `declared`
    ///
    /// `colorU$` becomes e.g. `colorU_3f9a0c1d`. Names without the marker are
    /// returned unchanged and not recorded.
    ///
    /// # Errors
    /// Returns [`SymbolError::DuplicateGeneratedName`] if `declared` was
    /// generated before
    pub fn generate(&self, declared: &str) -> Result<String, SymbolError> {
        let Some(stem) = declared.strip_suffix(FRESH_NAME_MARKER) else {
            return Ok(declared.to_string());
        };

        let mut inner = self.inner.write();
        if let Some(existing) = inner.get(declared) {
            return Err(SymbolError::DuplicateGeneratedName {
                declared: declared.to_string(),
                existing: existing.clone(),
            });
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let concrete = format!("{stem}_{}", &suffix[..8]);
        inner.insert(declared.to_string(), concrete.clone());
        tracing::debug!(declared, concrete = %concrete, "generated field name");
        Ok(concrete)
    }

    /// Concrete name previously generated for `declared`
    #[must_use]
    pub fn lookup(&self, declared: &str) -> Option<String> {
        self.inner.read().get(declared).cloned()
    }

    /// Number of generated names
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when no name was generated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
