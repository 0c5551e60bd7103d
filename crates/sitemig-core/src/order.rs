//! Order resolution
//!
//! Turns an [`OrderSpec`] into the explicit order value sent with a create
//! call. Sibling orders come from the current remote listing, so the value
//! is computed fresh for every action.

use crate::document::OrderSpec;
use crate::error::MigrationError;
use sitemig_gateway::{Attribute, AttributeModel, Dictionary};
use sitemig_symbol::SymbolTable;

/// Resolve `spec` given a lookup for the current order of an anchor
///
/// `None` means "append", in which case no order is sent.
///
/// # Errors
/// Propagates the lookup error for a missing anchor
pub fn resolve_order<F, E>(spec: &OrderSpec, default_order_of: F) -> Result<Option<u32>, E>
where
    F: FnOnce(&str) -> Result<u32, E>,
{
    match spec {
        OrderSpec::Start => Ok(Some(1)),
        OrderSpec::End => Ok(None),
        OrderSpec::Before(anchor) => default_order_of(anchor).map(Some),
        OrderSpec::After(anchor) => default_order_of(anchor).map(|order| Some(order + 1)),
    }
}

/// Current order of a position within `dictionary`
///
/// # Errors
/// Returns [`MigrationError::PositionNotFound`] if no sibling matches
pub fn position_order(symbols: &SymbolTable, dictionary: &Dictionary, anchor: &str) -> Result<u32, MigrationError> {
    let found = match symbols.get(anchor) {
        Some(entry) => dictionary.position_by_id(&entry.id),
        None => dictionary.position_named(anchor),
    };

    found.map(|p| p.order).ok_or_else(|| MigrationError::PositionNotFound {
        dictionary: dictionary.name.clone(),
        position: anchor.to_string(),
    })
}

/// Current order of an attribute among those of `model`
///
/// Non-alias anchors match the display name or the field name.
///
/// # Errors
/// Returns [`MigrationError::AttributeNotFound`] if no sibling matches
pub fn attribute_order(
    symbols: &SymbolTable,
    attributes: &[Attribute],
    model: AttributeModel,
    anchor: &str,
) -> Result<u32, MigrationError> {
    let mut siblings = attributes.iter().filter(|a| a.model == model);
    let found = match symbols.get(anchor) {
        Some(entry) => siblings.find(|a| a.id == entry.id),
        None => {
            let field = symbols.names().lookup(anchor);
            siblings.find(|a| a.name == anchor || a.field == anchor || Some(&a.field) == field.as_ref())
        }
    };

    found.map(|a| a.order).ok_or_else(|| MigrationError::AttributeNotFound {
        reference: anchor.to_string(),
    })
}
