//! Input document model
//!
//! A [`MigrationDocument`] is the already-parsed export of the source
//! system: schema actions followed by domain entities, each carrying
//! symbolic keys that later entries reference.
//!
//! All collections default to empty so partial documents (schema only,
//! data only) load without ceremony.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitemig_gateway::{AttributeModel, AttributeType};
use sitemig_symbol::{Aliases, EntityKind, RemoteId};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Field name -> declared value
pub type FieldMap = BTreeMap<String, AttributeValue>;

/// Complete migration input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationDocument {
    /// Identities that already exist on the target
    pub preseed: Vec<PreseedEntry>,
    /// Schema actions, applied in order
    pub schema: Vec<SchemaAction>,
    pub staff: Vec<StaffSpec>,
    pub clients: Vec<ClientSpec>,
    pub client_patches: Vec<ClientPatch>,
    pub client_groups: Vec<ClientGroupSpec>,
    pub meetings: Vec<MeetingSpec>,
}

impl MigrationDocument {
    /// Parse a JSON document
    ///
    /// # Errors
    /// Returns the parse error for malformed input
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Per-section counts
    #[must_use]
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            preseed: self.preseed.len(),
            schema_actions: self.schema.len(),
            staff: self.staff.len(),
            clients: self.clients.len(),
            client_patches: self.client_patches.len(),
            client_groups: self.client_groups.len(),
            meetings: self.meetings.len(),
        }
    }

    /// Whether any data-phase section is non-empty
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.summary().data_items() > 0
    }
}

/// Section sizes of a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub preseed: usize,
    pub schema_actions: usize,
    pub staff: usize,
    pub clients: usize,
    pub client_patches: usize,
    pub client_groups: usize,
    pub meetings: usize,
}

impl DocumentSummary {
    /// Items processed by the data phase
    #[must_use]
    pub fn data_items(&self) -> usize {
        self.staff + self.clients + self.client_patches + self.client_groups + self.meetings
    }
}

impl Display for DocumentSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "  preseed:        {}", self.preseed)?;
        writeln!(f, "  schema actions: {}", self.schema_actions)?;
        writeln!(f, "  staff:          {}", self.staff)?;
        writeln!(f, "  clients:        {}", self.clients)?;
        writeln!(f, "  client patches: {}", self.client_patches)?;
        writeln!(f, "  client groups:  {}", self.client_groups)?;
        write!(f, "  meetings:       {}", self.meetings)
    }
}

/// Identity known before the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreseedEntry {
    pub alias: String,
    pub id: RemoteId,
    pub kind: EntityKind,
}

// ============================================================================
// Schema actions
// ============================================================================

/// Schema-phase action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaAction {
    CreateDictionary(CreateDictionary),
    ExtendDictionary(ExtendDictionary),
    CreateAttribute(CreateAttribute),
}

impl SchemaAction {
    /// Wire name of the action kind
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::CreateDictionary(_) => "createDictionary",
            Self::ExtendDictionary(_) => "extendDictionary",
            Self::CreateAttribute(_) => "createAttribute",
        }
    }
}

/// New dictionary with its initial positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDictionary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn: Option<Aliases>,
    pub name: String,
    #[serde(default)]
    pub positions: Vec<PositionSpec>,
}

/// Positions appended to an existing dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendDictionary {
    /// Alias or display name of the dictionary
    pub dictionary: String,
    pub positions: Vec<PositionSpec>,
}

/// Typed field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn: Option<Aliases>,
    pub model: AttributeModel,
    pub name: String,
    /// Declared field name; a trailing `$` requests a generated one
    pub field: String,
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    /// Alias or display name of the linked dictionary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSpec>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multiple: bool,
}

/// Dictionary entry declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn: Option<Aliases>,
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    /// Only honoured by `extendDictionary`; initial positions keep list order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSpec>,
    #[serde(default)]
    pub values: FieldMap,
}

/// Relative placement among siblings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderSpec {
    Start,
    End,
    /// Alias or display name of the sibling
    Before(String),
    After(String),
}

// ============================================================================
// Values
// ============================================================================

/// Declared field value
///
/// Variant order matters for untagged deserialization: the reference
/// shapes are tried before the constant fallback, and arrays always parse
/// as [`AttributeValue::List`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// `{"ref": "<alias>"}`
    Reference(SymbolRef),
    /// `{"dictionary": "<alias or name>", "position": "<name>"}`
    Position(PositionRef),
    List(Vec<AttributeValue>),
    Constant(Value),
}

impl AttributeValue {
    /// Symbolic reference to `alias`
    #[must_use]
    pub fn reference(alias: impl Into<String>) -> Self {
        Self::Reference(SymbolRef { alias: alias.into() })
    }

    /// Named position within a dictionary
    #[must_use]
    pub fn position(dictionary: impl Into<String>, position: impl Into<String>) -> Self {
        Self::Position(PositionRef {
            dictionary: dictionary.into(),
            position: position.into(),
        })
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        Self::Constant(value)
    }
}

/// Reference to an alias in the symbol table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolRef {
    #[serde(rename = "ref")]
    pub alias: String,
}

/// Reference to a dictionary position by display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionRef {
    pub dictionary: String,
    pub position: String,
}

// ============================================================================
// Domain entities
// ============================================================================

/// Staff member to create or locate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSpec {
    pub nn: Aliases,
    pub email: String,
    /// Already present on the target; located by email instead of created
    #[serde(default)]
    pub existing: bool,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSpec {
    pub nn: Aliases,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaOverride>,
}

/// Update of a client created earlier in the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    /// Client alias
    pub client: String,
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn: Option<Aliases>,
    pub name: String,
    /// Member client aliases
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn: Option<Aliases>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub staff: Vec<Attendant>,
    #[serde(default)]
    pub clients: Vec<Attendant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaOverride>,
}

/// Meeting participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendant {
    #[serde(rename = "ref")]
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<String>,
}

/// Audit metadata to stamp onto a created entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaOverride {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Staff alias
    pub created_by: Option<String>,
    /// Staff alias
    pub updated_by: Option<String>,
}
