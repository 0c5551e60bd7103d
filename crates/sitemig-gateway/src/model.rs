//! Wire types for the remote platform
//!
//! Listings (`Dictionary`, `Attribute`) are what the read endpoints return;
//! `New*` types are create payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sitemig_symbol::RemoteId;

/// Dictionary as listed by the remote platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dictionary {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl Dictionary {
    /// Position with the given display name
    #[must_use]
    pub fn position_named(&self, name: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.name == name)
    }

    /// Position with the given id
    #[must_use]
    pub fn position_by_id(&self, id: &RemoteId) -> Option<&Position> {
        self.positions.iter().find(|p| &p.id == id)
    }
}

/// Dictionary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: RemoteId,
    pub name: String,
    /// Current default order (1-based)
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub disabled: bool,
}

/// Model an attribute attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeModel {
    Client,
    Meeting,
    Staff,
    ClientGroup,
}

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Text,
    LongText,
    Number,
    Boolean,
    Date,
    DateTime,
    Email,
    Phone,
    Dictionary,
}

/// Attribute definition as listed by the remote platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: RemoteId,
    pub model: AttributeModel,
    pub name: String,
    /// Externally visible field name used in entity payloads
    pub field: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub dictionary_id: Option<RemoteId>,
}

/// Create payload for a dictionary and its initial positions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDictionary {
    pub name: String,
    pub positions: Vec<NewPosition>,
}

/// Create payload for a position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub values: Map<String, Value>,
}

/// Create payload for an attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttribute {
    pub model: AttributeModel,
    pub name: String,
    pub field: String,
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<RemoteId>,
    pub required: bool,
    pub multiple: bool,
}

/// Result of creating a dictionary
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedDictionary {
    pub id: RemoteId,
    /// Ids of the initial positions, in request order
    #[serde(default)]
    pub positions: Vec<Created>,
}

/// Bare create response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Created {
    pub id: RemoteId,
}

/// Data-phase entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityModel {
    Staff,
    Client,
    ClientGroup,
    Meeting,
}

impl EntityModel {
    /// Collection path segment
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Staff => "members",
            Self::Client => "clients",
            Self::ClientGroup => "client-groups",
            Self::Meeting => "meetings",
        }
    }
}

/// Post-hoc metadata override for a created entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPayload {
    pub model: EntityModel,
    pub id: RemoteId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RemoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<RemoteId>,
}

/// Staff lookup result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaffRecord {
    pub id: RemoteId,
    pub email: String,
}

/// Caller's rights on the target facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub can_manage_schema: bool,
    #[serde(default)]
    pub can_manage_data: bool,
}

/// Current record counts on the target facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordCounts {
    pub staff: u64,
    pub clients: u64,
    pub client_groups: u64,
    pub meetings: u64,
    pub dictionaries: u64,
    pub attributes: u64,
}
