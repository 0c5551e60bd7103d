//! Response envelope decoding
//!
//! Every response is `{ "data": ..., "errors": [...] }`. A non-empty `errors`
//! list always wins over `data`. `data` must be present; an explicit `null`
//! is accepted, an absent key is not.

use crate::error::{GatewayError, RemoteErrorDetail};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<RemoteErrorDetail>,
}

/// `Some` whenever the key exists, including `null`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Extract `data` from a response body
///
/// # Errors
/// - [`GatewayError::RemoteApplication`] if `errors` is non-empty
/// - [`GatewayError::MalformedResponse`] if the body is not an envelope or
///   has no `data`
pub fn unwrap_data(path: &str, body: Value) -> Result<Value, GatewayError> {
    let envelope: Envelope = serde_json::from_value(body).map_err(|e| GatewayError::MalformedResponse {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    if !envelope.errors.is_empty() {
        return Err(GatewayError::RemoteApplication {
            path: path.to_string(),
            errors: envelope.errors,
        });
    }
    envelope.data.ok_or_else(|| GatewayError::MalformedResponse {
        path: path.to_string(),
        message: "envelope has neither data nor errors".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn returns_data() {
        let data = unwrap_data("/x", json!({ "data": { "id": "1" } })).unwrap();
        assert_eq!(data, json!({ "id": "1" }));
    }

    #[test]
    fn errors_win_over_data() {
        let err = unwrap_data(
            "/x",
            json!({ "data": { "id": "1" }, "errors": [{ "message": "conflict", "code": "409" }] }),
        )
        .unwrap_err();
        match err {
            GatewayError::RemoteApplication { path, errors } => {
                assert_eq!(path, "/x");
                assert_eq!(errors[0].message, "conflict");
            }
            other => panic!("expected RemoteApplication, got {other:?}"),
        }
    }

    #[test]
    fn empty_errors_list_is_success() {
        assert_eq!(unwrap_data("/x", json!({ "data": 3, "errors": [] })).unwrap(), json!(3));
    }

    #[test]
    fn missing_data_is_malformed() {
        for body in [json!({}), json!({ "errors": [] })] {
            match unwrap_data("/x", body) {
                Err(GatewayError::MalformedResponse { path, .. }) => assert_eq!(path, "/x"),
                other => panic!("expected MalformedResponse, got {other:?}"),
            }
        }
    }

    #[test]
    fn explicit_null_data_is_accepted() {
        assert_eq!(unwrap_data("/x", json!({ "data": null })).unwrap(), Value::Null);
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            unwrap_data("/x", json!([1, 2])),
            Err(GatewayError::MalformedResponse { .. })
        ));
    }
}
