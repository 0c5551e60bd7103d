//! Reference resolution
//!
//! Replaces symbolic values in a [`FieldMap`] with concrete remote values:
//! - `{"ref": alias}` becomes the identity bound to the alias
//! - `{"dictionary", "position"}` becomes the position id
//! - lists resolve element by element, keeping order
//! - constants pass through
//!
//! Empty results (`null`, or a list left empty) drop the field entirely.
//! Declared field names carrying the fresh-name marker are swapped for
//! their generated concrete names.

use crate::document::{AttributeValue, FieldMap, PositionRef};
use crate::error::MigrationError;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use sitemig_gateway::{Dictionary, Gateway};
use sitemig_symbol::{needs_fresh_name, RemoteId, SymbolTable};

/// Resolves document values against the symbol table and remote listings
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    symbols: &'a SymbolTable,
    gateway: &'a Gateway,
}

impl<'a> ReferenceResolver<'a> {
    #[inline]
    #[must_use]
    pub fn new(symbols: &'a SymbolTable, gateway: &'a Gateway) -> Self {
        Self { symbols, gateway }
    }

    /// Resolve every field into a JSON object with sorted keys
    ///
    /// # Errors
    /// Fails on the first unresolvable field
    pub async fn resolve_fields(&self, fields: &FieldMap) -> Result<Map<String, Value>, MigrationError> {
        let mut out = Map::new();
        for (declared, value) in fields {
            let name = self.field_name(declared)?;
            if let Some(resolved) = self.resolve_value(value).await? {
                out.insert(name, resolved);
            }
        }
        Ok(out)
    }

    /// Resolve one value; `None` when it is empty
    ///
    /// # Errors
    /// See [`ReferenceResolver::resolve_fields`]
    pub fn resolve_value<'s>(
        &'s self,
        value: &'s AttributeValue,
    ) -> BoxFuture<'s, Result<Option<Value>, MigrationError>> {
        Box::pin(async move {
            match value {
                AttributeValue::Constant(Value::Null) => Ok(None),
                AttributeValue::Constant(constant) => Ok(Some(constant.clone())),
                AttributeValue::Reference(reference) => {
                    let id = self.symbols.resolve(&reference.alias)?;
                    Ok(Some(Value::String(id.into_string())))
                }
                AttributeValue::Position(position) => {
                    let id = self.position_id(position).await?;
                    Ok(Some(Value::String(id.into_string())))
                }
                AttributeValue::List(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        if let Some(v) = self.resolve_value(item).await? {
                            resolved.push(v);
                        }
                    }
                    Ok((!resolved.is_empty()).then_some(Value::Array(resolved)))
                }
            }
        })
    }

    /// Concrete field name for a declared one
    ///
    /// # Errors
    /// Returns [`MigrationError::AttributeNotFound`] for a marked name that
    /// was never generated
    pub fn field_name(&self, declared: &str) -> Result<String, MigrationError> {
        if !needs_fresh_name(declared) {
            return Ok(declared.to_string());
        }
        self.symbols
            .names()
            .lookup(declared)
            .ok_or_else(|| MigrationError::AttributeNotFound {
                reference: declared.to_string(),
            })
    }

    /// Dictionary by alias or display name, from the cached listing
    ///
    /// # Errors
    /// Returns [`MigrationError::DictionaryNotFound`] if nothing matches
    pub async fn find_dictionary(&self, reference: &str) -> Result<Dictionary, MigrationError> {
        let listing = self.gateway.dictionaries().await?;
        let found = match self.symbols.get(reference) {
            Some(entry) => listing.iter().find(|d| d.id == entry.id),
            None => listing.iter().find(|d| d.name == reference),
        };

        found.cloned().ok_or_else(|| MigrationError::DictionaryNotFound {
            reference: reference.to_string(),
        })
    }

    async fn position_id(&self, position: &PositionRef) -> Result<RemoteId, MigrationError> {
        let dictionary = self.find_dictionary(&position.dictionary).await?;
        dictionary
            .position_named(&position.position)
            .map(|p| p.id.clone())
            .ok_or_else(|| MigrationError::PositionNotFound {
                dictionary: dictionary.name.clone(),
                position: position.position.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sitemig_symbol::EntityKind;
    use sitemig_test_utils::{gateway_for, FakePlatform};
    use std::sync::Arc;

    fn fields(value: Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn resolves_every_value_shape() {
        let platform = Arc::new(FakePlatform::new().with_dictionary("Colors", &["Red", "Blue"]));
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();
        symbols
            .define(&"staff:anna".try_into().unwrap(), &RemoteId::new("s-9"), EntityKind::Staff)
            .unwrap();
        let blue = platform.dictionary_named("Colors").unwrap().positions[1].id.clone();

        let resolver = ReferenceResolver::new(&symbols, &gateway);
        let out = resolver
            .resolve_fields(&fields(json!({
                "owner": {"ref": "staff:anna"},
                "color": {"dictionary": "Colors", "position": "Blue"},
                "tags": [{"ref": "staff:anna"}, "x"],
                "age": 42
            })))
            .await
            .unwrap();

        assert_eq!(
            Value::Object(out),
            json!({"age": 42, "color": blue, "owner": "s-9", "tags": ["s-9", "x"]})
        );
    }

    #[tokio::test]
    async fn empty_values_are_omitted() {
        let platform = Arc::new(FakePlatform::new());
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();

        let out = ReferenceResolver::new(&symbols, &gateway)
            .resolve_fields(&fields(json!({"a": null, "b": [], "c": [null], "d": ""})))
            .await
            .unwrap();

        assert_eq!(Value::Object(out), json!({"d": ""}));
    }

    #[tokio::test]
    async fn unresolved_reference_fails() {
        let platform = Arc::new(FakePlatform::new());
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();

        let err = ReferenceResolver::new(&symbols, &gateway)
            .resolve_fields(&fields(json!({"a": {"ref": "missing"}})))
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::Symbol(_)));
        assert!(platform.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_dictionary_and_position() {
        let platform = Arc::new(FakePlatform::new().with_dictionary("Colors", &["Red"]));
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();
        let resolver = ReferenceResolver::new(&symbols, &gateway);

        let err = resolver
            .resolve_value(&AttributeValue::position("Sizes", "Large"))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::DictionaryNotFound { .. }));

        let err = resolver
            .resolve_value(&AttributeValue::position("Colors", "Teal"))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::PositionNotFound { .. }));
    }

    #[tokio::test]
    async fn dictionary_alias_takes_precedence_over_name() {
        let platform = Arc::new(
            FakePlatform::new()
                .with_dictionary("Colors", &["Red"])
                .with_dictionary("Legacy", &["Red"]),
        );
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();
        let legacy = platform.dictionary_named("Legacy").unwrap();
        symbols
            .define(&"Colors".try_into().unwrap(), &legacy.id, EntityKind::Dictionary)
            .unwrap();

        let found = ReferenceResolver::new(&symbols, &gateway)
            .find_dictionary("Colors")
            .await
            .unwrap();
        assert_eq!(found.id, legacy.id);
    }

    #[tokio::test]
    async fn generated_field_names_are_substituted() {
        let platform = Arc::new(FakePlatform::new());
        let gateway = gateway_for(&platform);
        let symbols = SymbolTable::new();
        let concrete = symbols.names().generate("colorU$").unwrap();
        let resolver = ReferenceResolver::new(&symbols, &gateway);

        assert_eq!(resolver.field_name("colorU$").unwrap(), concrete);
        assert_eq!(resolver.field_name("plain").unwrap(), "plain");
        assert!(matches!(
            resolver.field_name("sizeU$"),
            Err(MigrationError::AttributeNotFound { .. })
        ));
    }
}
