//! Document fixtures as raw JSON

use serde_json::{json, Value};

/// Dictionary with one position, a dictionary attribute with a generated
/// field name, and one client referencing the position
#[must_use]
pub fn color_document() -> Value {
    json!({
        "schema": [
            {
                "kind": "createDictionary",
                "nn": "dict:color",
                "name": "Colors",
                "positions": [{"nn": "color:red", "name": "Red"}]
            },
            {
                "kind": "createAttribute",
                "nn": "attr:color",
                "model": "client",
                "name": "Color",
                "field": "colorU$",
                "type": "dictionary",
                "dictionary": "dict:color"
            }
        ],
        "clients": [
            {"nn": "c1", "fields": {"colorU$": {"ref": "color:red"}}}
        ]
    })
}

/// Empty dictionary extended with P1 at the start, P2 after P1, P3 before P1
#[must_use]
pub fn ordering_document() -> Value {
    json!({
        "schema": [
            {"kind": "createDictionary", "nn": "dict:p", "name": "Priorities", "positions": []},
            {
                "kind": "extendDictionary",
                "dictionary": "dict:p",
                "positions": [
                    {"nn": "p1", "name": "P1", "order": "start"},
                    {"nn": "p2", "name": "P2", "order": {"after": "p1"}},
                    {"nn": "p3", "name": "P3", "order": {"before": "p1"}}
                ]
            }
        ]
    })
}

/// Staff, clients, a patch, a group and a meeting wired together by alias
#[must_use]
pub fn data_document() -> Value {
    json!({
        "staff": [
            {"nn": "staff:owner", "email": "owner@example.org", "existing": true},
            {
                "nn": ["staff:anna", "anna"],
                "email": "anna@example.org",
                "fields": {"firstName": "Anna"},
                "meta": {"createdAt": "2020-01-02T03:04:05Z", "createdBy": "staff:owner"}
            }
        ],
        "clients": [
            {"nn": "client:1", "fields": {"name": "Bob", "caretaker": {"ref": "anna"}}},
            {"nn": "client:2", "fields": {"name": "Carol", "note": null}}
        ],
        "clientPatches": [
            {"client": "client:1", "fields": {"referredBy": {"ref": "client:2"}}}
        ],
        "clientGroups": [
            {"nn": "group:family", "name": "Family", "clients": ["client:1", "client:2"]}
        ],
        "meetings": [
            {
                "nn": "meeting:1",
                "fields": {"topic": "Intake"},
                "staff": [{"ref": "staff:anna", "attendance": "present"}],
                "clients": [{"ref": "client:1"}],
                "meta": {"updatedBy": "staff:anna"}
            }
        ]
    })
}
