//! In-memory stand-in for the remote platform

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use sitemig_gateway::{
    ApiRequest, Attribute, AttributeModel, Dictionary, EntityModel, Method, Permissions, Position,
    Transport, TransportError,
};
use sitemig_symbol::RemoteId;

/// Entity stored by a create call
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub model: EntityModel,
    pub id: RemoteId,
    pub payload: Map<String, Value>,
}

#[derive(Debug)]
struct PlatformState {
    next_id: u64,
    dictionaries: Vec<Dictionary>,
    attributes: Vec<Attribute>,
    entities: Vec<StoredEntity>,
    metadata: Vec<Value>,
    permissions: Permissions,
    requests: Vec<ApiRequest>,
    transient_failures: usize,
    rejections: Vec<(String, String)>,
}

impl PlatformState {
    fn fresh_id(&mut self, prefix: &str) -> RemoteId {
        self.next_id += 1;
        RemoteId::new(format!("{prefix}-{}", self.next_id))
    }
}

/// Fake remote platform implementing [`Transport`]
///
/// Behaves like the real API for the routes the gateway uses: ids are
/// assigned sequentially, explicit orders shift later siblings down, and
/// every response is wrapped in the `data`/`errors` envelope. Every request
/// is recorded, including the ones that were made to fail.
#[derive(Debug)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    /// Empty platform; the caller may manage schema and data
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState {
                next_id: 0,
                dictionaries: Vec::new(),
                attributes: Vec::new(),
                entities: Vec::new(),
                metadata: Vec::new(),
                permissions: Permissions {
                    can_manage_schema: true,
                    can_manage_data: true,
                },
                requests: Vec::new(),
                transient_failures: 0,
                rejections: Vec::new(),
            }),
        }
    }

    /// Seed an existing dictionary
    #[must_use]
    pub fn with_dictionary(self, name: &str, positions: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.fresh_id("dict");
            let mut created = Vec::with_capacity(positions.len());
            for (i, position) in positions.iter().enumerate() {
                created.push(Position {
                    id: state.fresh_id("pos"),
                    name: (*position).to_string(),
                    order: u32::try_from(i + 1).unwrap_or(u32::MAX),
                    disabled: false,
                });
            }
            state.dictionaries.push(Dictionary {
                id,
                name: name.to_string(),
                positions: created,
            });
        }
        self
    }

    /// Seed an existing attribute, appended after its siblings
    #[must_use]
    pub fn with_attribute(self, model: AttributeModel, name: &str, field: &str) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.fresh_id("attr");
            let order = make_room(
                state.attributes.iter_mut().filter(|a| a.model == model).map(|a| &mut a.order),
                None,
            );
            state.attributes.push(Attribute {
                id,
                model,
                name: name.to_string(),
                field: field.to_string(),
                order,
                dictionary_id: None,
            });
        }
        self
    }

    /// Seed an existing staff member
    #[must_use]
    pub fn with_staff(self, email: &str) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.fresh_id("member");
            let mut payload = Map::new();
            payload.insert("email".into(), Value::String(email.to_string()));
            state.entities.push(StoredEntity {
                model: EntityModel::Staff,
                id,
                payload,
            });
        }
        self
    }

    #[must_use]
    pub fn with_permissions(self, permissions: Permissions) -> Self {
        self.state.lock().permissions = permissions;
        self
    }

    /// Fail the next `count` requests with a transient transport error
    pub fn fail_transient(&self, count: usize) {
        self.state.lock().transient_failures = count;
    }

    /// Answer requests whose path contains `fragment` with an application error
    pub fn reject(&self, fragment: &str, message: &str) {
        self.state
            .lock()
            .rejections
            .push((fragment.to_string(), message.to_string()));
    }

    /// Every request received, in order
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    /// Every non-GET request received, in order
    #[must_use]
    pub fn mutations(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutation())
            .collect()
    }

    /// Requests whose path ends with `suffix`
    #[must_use]
    pub fn requests_to(&self, method: Method, suffix: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.ends_with(suffix))
            .collect()
    }

    #[must_use]
    pub fn dictionaries(&self) -> Vec<Dictionary> {
        self.state.lock().dictionaries.clone()
    }

    #[must_use]
    pub fn dictionary_named(&self, name: &str) -> Option<Dictionary> {
        self.state.lock().dictionaries.iter().find(|d| d.name == name).cloned()
    }

    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        self.state.lock().attributes.clone()
    }

    /// Stored entities of one model, in creation order
    #[must_use]
    pub fn entities(&self, model: EntityModel) -> Vec<StoredEntity> {
        self.state
            .lock()
            .entities
            .iter()
            .filter(|e| e.model == model)
            .cloned()
            .collect()
    }

    /// Id of a stored staff member
    #[must_use]
    pub fn staff_id(&self, email: &str) -> Option<RemoteId> {
        self.entities(EntityModel::Staff)
            .into_iter()
            .find(|e| e.payload.get("email").and_then(Value::as_str) == Some(email))
            .map(|e| e.id)
    }

    /// Metadata overwrite bodies, in order
    #[must_use]
    pub fn metadata(&self) -> Vec<Value> {
        self.state.lock().metadata.clone()
    }

    fn handle(state: &mut PlatformState, request: &ApiRequest) -> Result<Value, String> {
        let rest = request
            .path
            .strip_prefix("/facilities/")
            .and_then(|p| p.split_once('/'))
            .map(|(_, rest)| rest)
            .ok_or_else(|| format!("unknown route {}", request.path))?;
        let segments: Vec<&str> = rest.split('/').collect();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Get, ["dictionaries"]) => to_value(&state.dictionaries),
            (Method::Post, ["dictionaries"]) => create_dictionary(state, &body),
            (Method::Post, ["dictionaries", dictionary, "positions"]) => create_position(state, dictionary, &body),
            (Method::Get, ["attributes"]) => to_value(&state.attributes),
            (Method::Post, ["attributes"]) => create_attribute(state, &body),
            (Method::Get, ["members"]) => {
                let email = request
                    .query
                    .iter()
                    .find(|(k, _)| k == "email")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                let found: Vec<Value> = state
                    .entities
                    .iter()
                    .filter(|e| e.model == EntityModel::Staff)
                    .filter_map(|e| {
                        let stored = e.payload.get("email")?.as_str()?;
                        stored
                            .eq_ignore_ascii_case(&email)
                            .then(|| json!({ "id": e.id, "email": stored }))
                    })
                    .collect();
                Ok(Value::Array(found))
            }
            (Method::Post, [collection]) if model_of(collection).is_some() => {
                let model = model_of(collection).ok_or("unknown collection")?;
                let payload = body.as_object().cloned().ok_or("entity payload must be an object")?;
                let id = state.fresh_id(collection);
                state.entities.push(StoredEntity {
                    model,
                    id: id.clone(),
                    payload,
                });
                Ok(json!({ "id": id }))
            }
            (Method::Patch, [collection, id]) if model_of(collection).is_some() => {
                let model = model_of(collection).ok_or("unknown collection")?;
                let entity = state
                    .entities
                    .iter_mut()
                    .find(|e| e.model == model && e.id.as_str() == *id)
                    .ok_or_else(|| format!("no {collection} with id {id}"))?;
                if let Value::Object(changes) = body {
                    entity.payload.extend(changes);
                }
                Ok(json!({ "id": id }))
            }
            (Method::Post, ["metadata"]) => {
                state.metadata.push(body);
                Ok(json!({}))
            }
            (Method::Get, ["permissions"]) => Ok(json!({
                "canManageSchema": state.permissions.can_manage_schema,
                "canManageData": state.permissions.can_manage_data,
            })),
            (Method::Get, ["counts"]) => {
                let count = |model: EntityModel| state.entities.iter().filter(|e| e.model == model).count();
                Ok(json!({
                    "staff": count(EntityModel::Staff),
                    "clients": count(EntityModel::Client),
                    "clientGroups": count(EntityModel::ClientGroup),
                    "meetings": count(EntityModel::Meeting),
                    "dictionaries": state.dictionaries.len(),
                    "attributes": state.attributes.len(),
                }))
            }
            _ => Err(format!("unknown route {:?} {}", request.method, request.path)),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakePlatform {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(TransportError::Transient("connection reset by peer".into()));
        }

        if let Some((_, message)) = state
            .rejections
            .iter()
            .find(|(fragment, _)| request.path.contains(fragment.as_str()))
        {
            return Ok(json!({ "data": null, "errors": [{ "message": message }] }));
        }

        match Self::handle(&mut state, &request) {
            Ok(data) => Ok(json!({ "data": data })),
            Err(message) => Ok(json!({ "data": null, "errors": [{ "message": message }] })),
        }
    }
}

fn model_of(collection: &str) -> Option<EntityModel> {
    [
        EntityModel::Staff,
        EntityModel::Client,
        EntityModel::ClientGroup,
        EntityModel::Meeting,
    ]
    .into_iter()
    .find(|m| m.collection() == collection)
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn requested_order(body: &Value) -> Option<u32> {
    body.get("order")
        .and_then(Value::as_u64)
        .and_then(|o| u32::try_from(o).ok())
}

/// Slot for a new sibling; siblings at or after the slot move down by one
fn make_room<'a>(orders: impl Iterator<Item = &'a mut u32>, requested: Option<u32>) -> u32 {
    let mut orders: Vec<&mut u32> = orders.collect();
    let last = u32::try_from(orders.len() + 1).unwrap_or(u32::MAX);
    let slot = requested.map_or(last, |k| k.clamp(1, last));
    for order in &mut orders {
        if **order >= slot {
            **order += 1;
        }
    }
    slot
}

fn name_of(body: &Value) -> Result<String, String> {
    body.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "missing name".to_string())
}

fn create_dictionary(state: &mut PlatformState, body: &Value) -> Result<Value, String> {
    let name = name_of(body)?;
    let id = state.fresh_id("dict");
    let mut positions = Vec::new();
    let mut ids = Vec::new();
    for (i, spec) in body
        .get("positions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        let position_id = state.fresh_id("pos");
        ids.push(json!({ "id": position_id }));
        positions.push(Position {
            id: position_id,
            name: name_of(spec)?,
            order: u32::try_from(i + 1).unwrap_or(u32::MAX),
            disabled: spec.get("disabled").and_then(Value::as_bool).unwrap_or(false),
        });
    }
    state.dictionaries.push(Dictionary {
        id: id.clone(),
        name,
        positions,
    });
    Ok(json!({ "id": id, "positions": ids }))
}

fn create_position(state: &mut PlatformState, dictionary: &str, body: &Value) -> Result<Value, String> {
    let name = name_of(body)?;
    let id = state.fresh_id("pos");
    let dict = state
        .dictionaries
        .iter_mut()
        .find(|d| d.id.as_str() == dictionary)
        .ok_or_else(|| format!("no dictionary with id {dictionary}"))?;
    let order = make_room(dict.positions.iter_mut().map(|p| &mut p.order), requested_order(body));
    dict.positions.push(Position {
        id: id.clone(),
        name,
        order,
        disabled: body.get("disabled").and_then(Value::as_bool).unwrap_or(false),
    });
    dict.positions.sort_by_key(|p| p.order);
    Ok(json!({ "id": id }))
}

fn create_attribute(state: &mut PlatformState, body: &Value) -> Result<Value, String> {
    let model: AttributeModel =
        serde_json::from_value(body.get("model").cloned().unwrap_or(Value::Null)).map_err(|e| e.to_string())?;
    let name = name_of(body)?;
    let field = body
        .get("field")
        .and_then(Value::as_str)
        .ok_or("missing field")?
        .to_string();
    if state.attributes.iter().any(|a| a.model == model && a.field == field) {
        return Err(format!("field {field} already exists"));
    }
    let dictionary_id = body.get("dictionaryId").and_then(Value::as_str).map(RemoteId::new);
    let id = state.fresh_id("attr");
    let order = make_room(
        state.attributes.iter_mut().filter(|a| a.model == model).map(|a| &mut a.order),
        requested_order(body),
    );
    state.attributes.push(Attribute {
        id: id.clone(),
        model,
        name,
        field,
        order,
        dictionary_id,
    });
    Ok(json!({ "id": id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_order_shifts_siblings() {
        let platform = FakePlatform::new().with_dictionary("Colors", &["Red", "Green"]);
        let dict = platform.dictionary_named("Colors").unwrap();

        platform
            .send(ApiRequest::post(
                format!("/facilities/f/dictionaries/{}/positions", dict.id),
                json!({"name": "Blue", "order": 1}),
            ))
            .await
            .unwrap();

        let dict = platform.dictionary_named("Colors").unwrap();
        let order: Vec<_> = dict.positions.iter().map(|p| (p.name.as_str(), p.order)).collect();
        assert_eq!(order, vec![("Blue", 1), ("Red", 2), ("Green", 3)]);
    }

    #[tokio::test]
    async fn responses_use_envelope() {
        let platform = FakePlatform::new();
        let body = platform.send(ApiRequest::get("/facilities/f/dictionaries")).await.unwrap();
        assert_eq!(body, json!({"data": []}));

        let body = platform.send(ApiRequest::get("/facilities/f/nowhere")).await.unwrap();
        assert!(body["errors"][0]["message"].as_str().unwrap().contains("unknown route"));
    }

    #[tokio::test]
    async fn transient_failures_are_counted_down() {
        let platform = FakePlatform::new();
        platform.fail_transient(1);

        let first = platform.send(ApiRequest::get("/facilities/f/attributes")).await;
        assert!(matches!(first, Err(TransportError::Transient(_))));
        let second = platform.send(ApiRequest::get("/facilities/f/attributes")).await;
        assert!(second.is_ok());
        assert_eq!(platform.requests().len(), 2);
    }

    #[tokio::test]
    async fn staff_lookup_is_case_insensitive() {
        let platform = FakePlatform::new().with_staff("Anna@Example.org");
        let body = platform
            .send(ApiRequest::get("/facilities/f/members").with_query("email", "anna@example.org"))
            .await
            .unwrap();
        assert_eq!(body["data"][0]["id"], json!(platform.staff_id("Anna@Example.org").unwrap()));
    }
}
