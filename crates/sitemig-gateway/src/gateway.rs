//! Remote gateway
//!
//! Wraps a [`Transport`] with:
//! - bounded retry of transient failures ([`RetryPolicy`])
//! - envelope decoding (application errors are fatal, never retried)
//! - the dictionary and attribute listing caches, invalidated whenever a
//!   mutation of the matching kind succeeds

use crate::cache::ListingCache;
use crate::envelope::unwrap_data;
use crate::error::{GatewayError, TransportError};
use crate::model::{
    Attribute, Created, CreatedDictionary, Dictionary, EntityModel, MetaPayload, NewAttribute, NewDictionary,
    NewPosition, Permissions, RecordCounts, StaffRecord,
};
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sitemig_symbol::RemoteId;
use std::sync::Arc;

/// Kind of a mutating call, deciding which cache it invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Dictionary created
    Dictionary,
    /// Position created
    Position,
    /// Attribute created
    Attribute,
    /// Data-phase entity created or patched
    Entity,
    /// Metadata overwritten
    Metadata,
}

impl MutationKind {
    fn touches_dictionaries(self) -> bool {
        matches!(self, Self::Dictionary | Self::Position)
    }

    fn touches_attributes(self) -> bool {
        matches!(self, Self::Attribute)
    }
}

/// Gateway to one facility on the remote platform
pub struct Gateway {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    facility: String,
    dictionaries: ListingCache<Dictionary>,
    attributes: ListingCache<Attribute>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("facility", &self.facility)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create gateway with the default retry policy
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, facility: impl Into<String>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            facility: facility.into(),
            dictionaries: ListingCache::new(),
            attributes: ListingCache::new(),
        }
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Facility this gateway targets
    #[inline]
    #[must_use]
    pub fn facility(&self) -> &str {
        &self.facility
    }

    /// Retry policy in effect
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn path(&self, tail: &str) -> String {
        format!("/facilities/{}/{tail}", self.facility)
    }

    /// Send with retry and envelope decoding, invalidating caches on success
    async fn call(&self, request: ApiRequest, mutation: Option<MutationKind>) -> Result<Value, GatewayError> {
        let path = request.path.clone();
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.send(request.clone()).await {
                Ok(body) => {
                    let data = unwrap_data(&path, body)?;
                    if let Some(kind) = mutation {
                        self.invalidate(kind).await;
                    }
                    return Ok(data);
                }
                Err(TransportError::Transient(message)) if attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        path = %path,
                        attempt,
                        max_attempts,
                        delay_ms = self.retry.delay_ms_after(attempt),
                        "transient failure, retrying: {}",
                        message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(TransportError::Transient(message)) => {
                    return Err(GatewayError::TransientExhausted {
                        attempts: attempt,
                        last: message,
                    });
                }
                Err(TransportError::Fatal(message)) => {
                    return Err(GatewayError::Transport { path, message });
                }
            }
        }
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        mutation: Option<MutationKind>,
    ) -> Result<T, GatewayError> {
        let path = request.path.clone();
        let data = self.call(request, mutation).await?;
        serde_json::from_value(data).map_err(|source| GatewayError::Decode { path, source })
    }

    async fn invalidate(&self, kind: MutationKind) {
        if kind.touches_dictionaries() {
            tracing::trace!(facility = %self.facility, "dictionary cache invalidated");
            self.dictionaries.invalidate(&self.facility).await;
        }
        if kind.touches_attributes() {
            tracing::trace!(facility = %self.facility, "attribute cache invalidated");
            self.attributes.invalidate(&self.facility).await;
        }
    }

    /// All dictionaries with their positions (cached)
    ///
    /// # Errors
    /// Returns error if the listing cannot be fetched
    pub async fn dictionaries(&self) -> Result<Arc<Vec<Dictionary>>, GatewayError> {
        self.dictionaries
            .try_get_or_fetch(&self.facility, || {
                self.call_as(ApiRequest::get(self.path("dictionaries")), None)
            })
            .await
    }

    /// All attribute definitions (cached)
    ///
    /// # Errors
    /// Returns error if the listing cannot be fetched
    pub async fn attributes(&self) -> Result<Arc<Vec<Attribute>>, GatewayError> {
        self.attributes
            .try_get_or_fetch(&self.facility, || {
                self.call_as(ApiRequest::get(self.path("attributes")), None)
            })
            .await
    }

    /// Create a dictionary with its initial positions
    ///
    /// # Errors
    /// Returns error if the call fails or the response lacks position ids
    pub async fn create_dictionary(&self, dictionary: &NewDictionary) -> Result<CreatedDictionary, GatewayError> {
        let request = ApiRequest::post(self.path("dictionaries"), to_body(dictionary));
        let path = request.path.clone();
        let created: CreatedDictionary = self.call_as(request, Some(MutationKind::Dictionary)).await?;

        if created.positions.len() != dictionary.positions.len() {
            return Err(GatewayError::MalformedResponse {
                path,
                message: format!(
                    "expected {} position ids, got {}",
                    dictionary.positions.len(),
                    created.positions.len()
                ),
            });
        }
        Ok(created)
    }

    /// Append a position to an existing dictionary
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn create_position(&self, dictionary: &RemoteId, position: &NewPosition) -> Result<RemoteId, GatewayError> {
        let request = ApiRequest::post(
            self.path(&format!("dictionaries/{dictionary}/positions")),
            to_body(position),
        );
        let created: Created = self.call_as(request, Some(MutationKind::Position)).await?;
        Ok(created.id)
    }

    /// Create an attribute definition
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn create_attribute(&self, attribute: &NewAttribute) -> Result<RemoteId, GatewayError> {
        let request = ApiRequest::post(self.path("attributes"), to_body(attribute));
        let created: Created = self.call_as(request, Some(MutationKind::Attribute)).await?;
        Ok(created.id)
    }

    /// Create a data-phase entity
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn create_entity(&self, model: EntityModel, payload: Value) -> Result<RemoteId, GatewayError> {
        let request = ApiRequest::post(self.path(model.collection()), payload);
        let created: Created = self.call_as(request, Some(MutationKind::Entity)).await?;
        Ok(created.id)
    }

    /// Patch a data-phase entity
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn patch_entity(&self, model: EntityModel, id: &RemoteId, payload: Value) -> Result<(), GatewayError> {
        let request = ApiRequest::patch(self.path(&format!("{}/{id}", model.collection())), payload);
        self.call(request, Some(MutationKind::Entity)).await?;
        Ok(())
    }

    /// Locate an existing staff member by contact address
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn find_staff_by_email(&self, email: &str) -> Result<Option<RemoteId>, GatewayError> {
        let request = ApiRequest::get(self.path(EntityModel::Staff.collection())).with_query("email", email);
        let found: Vec<StaffRecord> = self.call_as(request, None).await?;
        Ok(found
            .into_iter()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .map(|s| s.id))
    }

    /// Overwrite created/updated timestamps and authors
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn overwrite_metadata(&self, meta: &MetaPayload) -> Result<(), GatewayError> {
        let request = ApiRequest::post(self.path("metadata"), to_body(meta));
        self.call(request, Some(MutationKind::Metadata)).await?;
        Ok(())
    }

    /// Caller's rights on the facility
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn permissions(&self) -> Result<Permissions, GatewayError> {
        self.call_as(ApiRequest::get(self.path("permissions")), None).await
    }

    /// Current record counts on the facility
    ///
    /// # Errors
    /// Returns error if the call fails
    pub async fn record_counts(&self) -> Result<RecordCounts, GatewayError> {
        self.call_as(ApiRequest::get(self.path("counts")), None).await
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Value {
    // Payload types are plain structs with string keys; serialization cannot fail.
    serde_json::to_value(value).unwrap_or(Value::Null)
}
