//! Symbolic keys and remote identities
//!
//! Provides [`Aliases`], the normalized form of an `nn` declaration, and
//! [`RemoteId`], the opaque identity the remote API hands back on create.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Opaque identity assigned by the remote platform
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Wrap a remote identity
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the owned string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of remote entity a symbol is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Named collection of positions
    Dictionary,
    /// Entry within a dictionary
    Position,
    /// Field definition attached to a model
    Attribute,
    /// Staff member
    Staff,
    /// Client record
    Client,
    /// Group of clients
    ClientGroup,
    /// Scheduled meeting
    Meeting,
}

impl EntityKind {
    /// Stable lowercase name, as written to the audit log
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dictionary => "dictionary",
            Self::Position => "position",
            Self::Attribute => "attribute",
            Self::Staff => "staff",
            Self::Client => "client",
            Self::ClientGroup => "client_group",
            Self::Meeting => "meeting",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One or more aliases naming a single entity
///
/// Input documents may write `"nn": "a"` or `"nn": ["a", "b"]`; both
/// deserialize into this type. Aliases are kept in declaration order with
/// duplicates removed, and the set is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OneOrMany", into = "Vec<String>")]
pub struct Aliases(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<OneOrMany> for Aliases {
    type Error = SymbolError;

    fn try_from(value: OneOrMany) -> Result<Self, Self::Error> {
        match value {
            OneOrMany::One(alias) => Self::new([alias]),
            OneOrMany::Many(aliases) => Self::new(aliases),
        }
    }
}

impl From<Aliases> for Vec<String> {
    fn from(aliases: Aliases) -> Self {
        aliases.0
    }
}

impl Aliases {
    /// Build from any list of aliases
    ///
    /// # Errors
    /// Returns [`SymbolError::EmptyAliases`] if no non-blank alias is given
    pub fn new<I, S>(aliases: I) -> Result<Self, SymbolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = alias.into();
            if alias.trim().is_empty() || out.contains(&alias) {
                continue;
            }
            out.push(alias);
        }
        if out.is_empty() {
            return Err(SymbolError::EmptyAliases);
        }
        Ok(Self(out))
    }

    /// Single alias
    ///
    /// # Errors
    /// Returns [`SymbolError::EmptyAliases`] if `alias` is blank
    pub fn single(alias: impl Into<String>) -> Result<Self, SymbolError> {
        Self::new([alias.into()])
    }

    /// First declared alias, used to label actions in reports
    #[inline]
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    /// Iterate over all aliases
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of aliases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&str> for Aliases {
    type Error = SymbolError;

    fn try_from(alias: &str) -> Result<Self, Self::Error> {
        Self::single(alias)
    }
}

impl Display for Aliases {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

/// Errors for symbol operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Alias already bound to another identity
    #[error("duplicate key '{alias}': already bound to {existing}, refusing {attempted}")]
    DuplicateKey {
        alias: String,
        existing: RemoteId,
        attempted: RemoteId,
    },

    /// Field name already had a concrete name generated for it
    #[error("generated name for '{declared}' already exists: {existing}")]
    DuplicateGeneratedName { declared: String, existing: String },

    /// Alias was never defined
    #[error("unresolved reference '{alias}'")]
    UnresolvedReference { alias: String },

    /// Declaration without any usable alias
    #[error("symbolic key must name at least one alias")]
    EmptyAliases,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_from_single_string() {
        let aliases: Aliases = serde_json::from_str(r#""client:1""#).unwrap();
        assert_eq!(aliases.primary(), "client:1");
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn aliases_from_list_dedupes_in_order() {
        let aliases: Aliases = serde_json::from_str(r#"["a", "b", "a", ""]"#).unwrap();
        assert_eq!(aliases.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn aliases_reject_empty_list() {
        let result: Result<Aliases, _> = serde_json::from_str("[]");
        assert!(result.is_err());
        assert_eq!(Aliases::new(Vec::<String>::new()), Err(SymbolError::EmptyAliases));
    }

    #[test]
    fn blank_single_alias_is_rejected() {
        assert_eq!(Aliases::single("  "), Err(SymbolError::EmptyAliases));
        assert_eq!(Aliases::try_from(""), Err(SymbolError::EmptyAliases));
        assert_eq!(Aliases::single("c1").unwrap().primary(), "c1");
    }

    #[test]
    fn aliases_serialize_as_list() {
        let aliases = Aliases::new(["x", "y"]).unwrap();
        assert_eq!(serde_json::to_string(&aliases).unwrap(), r#"["x","y"]"#);
    }

    #[test]
    fn entity_kind_names() {
        assert_eq!(EntityKind::ClientGroup.as_str(), "client_group");
        let kind: EntityKind = serde_json::from_str(r#""position""#).unwrap();
        assert_eq!(kind, EntityKind::Position);
    }

    #[test]
    fn remote_id_display() {
        assert_eq!(RemoteId::new("abc").to_string(), "abc");
    }
}
