//! Migration executor
//!
//! Applies a [`MigrationDocument`] to the target facility, one action at a
//! time. Phases run strictly in sequence:
//!
//! 1. pre-seed: bind known identities
//! 2. schema: dictionaries, positions, attributes
//! 3. data: staff, clients, client patches, client groups, meetings
//!
//! Every action walks the [`ActionState`] machine. The first failure stops
//! the run; entities created before it stay created and are listed in the
//! partial report carried by [`RunFailure`]. A failing action whose remote
//! create already succeeded keeps that id in its record.

use crate::document::{
    Attendant, ClientGroupSpec, ClientPatch, ClientSpec, CreateAttribute, CreateDictionary, ExtendDictionary,
    MeetingSpec, MetaOverride, MigrationDocument, PreseedEntry, SchemaAction, StaffSpec,
};
use crate::error::MigrationError;
use crate::order::{attribute_order, position_order, resolve_order};
use crate::progress::ProgressTracker;
use crate::resolve::ReferenceResolver;
use crate::state::{validate_transition, ActionState};
use crate::types::{ActionLabel, ActionRecord, ExecutorConfig, RunFailure, RunReport};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sitemig_gateway::{
    EntityModel, Gateway, MetaPayload, NewAttribute, NewDictionary, NewPosition, Permissions, RecordCounts,
};
use sitemig_symbol::{Aliases, EntityKind, RemoteId, SymbolTable};
use std::sync::Arc;

/// Sequential executor for migration documents
#[derive(Debug)]
pub struct MigrationExecutor {
    gateway: Gateway,
    symbols: Arc<SymbolTable>,
    config: ExecutorConfig,
}

impl MigrationExecutor {
    /// Create executor over `gateway`, registering into `symbols`
    #[must_use]
    pub fn new(gateway: Gateway, symbols: Arc<SymbolTable>) -> Self {
        Self {
            gateway,
            symbols,
            config: ExecutorConfig::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Verify the caller may apply `document` to the facility
    ///
    /// Nothing is mutated; call before [`MigrationExecutor::run`].
    ///
    /// # Errors
    /// Returns [`MigrationError::Permission`] if a needed right is missing
    pub async fn check_permissions(&self, document: &MigrationDocument) -> Result<Permissions, MigrationError> {
        let permissions = self.gateway.permissions().await?;
        let facility = self.gateway.facility();

        if !document.schema.is_empty() && !permissions.can_manage_schema {
            return Err(MigrationError::Permission(format!(
                "cannot manage schema on facility {facility}"
            )));
        }
        if !self.config.skip_data && document.has_data() && !permissions.can_manage_data {
            return Err(MigrationError::Permission(format!(
                "cannot manage data on facility {facility}"
            )));
        }
        Ok(permissions)
    }

    /// Current record counts on the facility
    ///
    /// # Errors
    /// Returns error if the remote call fails
    pub async fn record_counts(&self) -> Result<RecordCounts, MigrationError> {
        Ok(self.gateway.record_counts().await?)
    }

    /// Apply `document`
    ///
    /// # Errors
    /// Returns [`RunFailure`] with the failing action and the partial report
    pub async fn run(&self, document: &MigrationDocument) -> Result<RunReport, RunFailure> {
        tracing::info!(
            facility = %self.gateway.facility(),
            schema_actions = document.schema.len(),
            data_items = document.summary().data_items(),
            "migration started"
        );

        let mut journal = Journal::default();
        match self.run_phases(document, &mut journal).await {
            Ok(()) => {
                journal.report.symbols = self.symbols.len();
                tracing::info!(
                    registered = journal.report.registered(),
                    symbols = journal.report.symbols,
                    "migration complete"
                );
                Ok(journal.report)
            }
            Err(error) => Err(journal.fail(error, self.symbols.len())),
        }
    }

    async fn run_phases(&self, document: &MigrationDocument, journal: &mut Journal) -> Result<(), MigrationError> {
        let interval = self.config.progress_interval;

        let mut phase = ProgressTracker::new("preseed", document.preseed.len(), interval);
        for entry in &document.preseed {
            self.preseed(entry, journal)?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        let mut phase = ProgressTracker::new("schema", document.schema.len(), interval);
        for action in &document.schema {
            match action {
                SchemaAction::CreateDictionary(action) => self.create_dictionary(action, journal).await?,
                SchemaAction::ExtendDictionary(action) => self.extend_dictionary(action, journal).await?,
                SchemaAction::CreateAttribute(action) => self.create_attribute(action, journal).await?,
            }
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        if self.config.skip_data {
            tracing::info!("data phase skipped");
            return Ok(());
        }

        let mut phase = ProgressTracker::new("staff", document.staff.len(), interval);
        for staff in &document.staff {
            self.staff(staff, journal).await?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        let mut phase = ProgressTracker::new("clients", document.clients.len(), interval);
        for client in &document.clients {
            self.client(client, journal).await?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        let mut phase = ProgressTracker::new("client patches", document.client_patches.len(), interval);
        for patch in &document.client_patches {
            self.client_patch(patch, journal).await?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        let mut phase = ProgressTracker::new("client groups", document.client_groups.len(), interval);
        for group in &document.client_groups {
            self.client_group(group, journal).await?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        let mut phase = ProgressTracker::new("meetings", document.meetings.len(), interval);
        for (index, meeting) in document.meetings.iter().enumerate() {
            self.meeting(index, meeting, journal).await?;
            phase.tick();
        }
        journal.report.phases.push(phase.finish());

        Ok(())
    }

    fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.symbols, &self.gateway)
    }

    fn preseed(&self, entry: &PreseedEntry, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("preseed", entry.alias.clone()));
        journal.advance(ActionState::Resolving)?;
        self.symbols
            .define(&Aliases::single(entry.alias.clone())?, &entry.id, entry.kind)?;
        journal.registered(Some(entry.id.clone()))
    }

    // ------------------------------------------------------------------------
    // Schema phase
    // ------------------------------------------------------------------------

    async fn create_dictionary(&self, action: &CreateDictionary, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("createDictionary", subject(action.nn.as_ref(), &action.name)));
        journal.advance(ActionState::Resolving)?;

        let resolver = self.resolver();
        let mut positions = Vec::with_capacity(action.positions.len());
        for position in &action.positions {
            if position.order.is_some() {
                tracing::debug!(position = %position.name, "order ignored for initial position");
            }
            positions.push(NewPosition {
                name: position.name.clone(),
                order: None,
                disabled: position.disabled,
                values: resolver.resolve_fields(&position.values).await?,
            });
        }

        journal.advance(ActionState::Submitting)?;
        let created = self
            .gateway
            .create_dictionary(&NewDictionary {
                name: action.name.clone(),
                positions,
            })
            .await?;
        journal.created(&created.id);

        if let Some(nn) = &action.nn {
            self.symbols.define(nn, &created.id, EntityKind::Dictionary)?;
        }
        for (position, id) in action.positions.iter().zip(&created.positions) {
            if let Some(nn) = &position.nn {
                self.symbols.define(nn, &id.id, EntityKind::Position)?;
            }
        }
        journal.registered(Some(created.id))
    }

    async fn extend_dictionary(&self, action: &ExtendDictionary, journal: &mut Journal) -> Result<(), MigrationError> {
        let resolver = self.resolver();

        for position in &action.positions {
            journal.begin(ActionLabel::new(
                "extendDictionary",
                format!("{}/{}", action.dictionary, subject(position.nn.as_ref(), &position.name)),
            ));
            journal.advance(ActionState::Resolving)?;

            // Fresh listing: the previous position create invalidated the cache
            let dictionary = resolver.find_dictionary(&action.dictionary).await?;
            let order = match &position.order {
                Some(spec) => resolve_order(spec, |anchor| position_order(&self.symbols, &dictionary, anchor))?,
                None => None,
            };
            let values = resolver.resolve_fields(&position.values).await?;

            journal.advance(ActionState::Submitting)?;
            let id = self
                .gateway
                .create_position(
                    &dictionary.id,
                    &NewPosition {
                        name: position.name.clone(),
                        order,
                        disabled: position.disabled,
                        values,
                    },
                )
                .await?;
            journal.created(&id);

            if let Some(nn) = &position.nn {
                self.symbols.define(nn, &id, EntityKind::Position)?;
            }
            journal.registered(Some(id))?;
        }
        Ok(())
    }

    async fn create_attribute(&self, action: &CreateAttribute, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("createAttribute", subject(action.nn.as_ref(), &action.field)));
        journal.advance(ActionState::Resolving)?;

        let dictionary_id = match &action.dictionary {
            Some(reference) => Some(self.resolver().find_dictionary(reference).await?.id),
            None => None,
        };
        let order = match &action.order {
            Some(spec) => {
                let listing = self.gateway.attributes().await?;
                resolve_order(spec, |anchor| {
                    attribute_order(&self.symbols, &listing, action.model, anchor)
                })?
            }
            None => None,
        };
        let field = self.symbols.names().generate(&action.field)?;

        journal.advance(ActionState::Submitting)?;
        let id = self
            .gateway
            .create_attribute(&NewAttribute {
                model: action.model,
                name: action.name.clone(),
                field,
                value_type: action.value_type,
                order,
                dictionary_id,
                required: action.required,
                multiple: action.multiple,
            })
            .await?;
        journal.created(&id);

        if let Some(nn) = &action.nn {
            self.symbols.define(nn, &id, EntityKind::Attribute)?;
        }
        journal.registered(Some(id))
    }

    // ------------------------------------------------------------------------
    // Data phase
    // ------------------------------------------------------------------------

    async fn staff(&self, staff: &StaffSpec, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("staff", staff.nn.primary()));
        journal.advance(ActionState::Resolving)?;

        if staff.existing {
            let id = self
                .gateway
                .find_staff_by_email(&staff.email)
                .await?
                .ok_or_else(|| MigrationError::StaffNotFound {
                    email: staff.email.clone(),
                })?;
            self.symbols.define(&staff.nn, &id, EntityKind::Staff)?;
            return journal.registered(Some(id));
        }

        let mut payload = self.resolver().resolve_fields(&staff.fields).await?;
        payload.insert("email".into(), Value::String(staff.email.clone()));
        let meta = self.resolve_meta(staff.meta.as_ref())?;

        journal.advance(ActionState::Submitting)?;
        let id = self.gateway.create_entity(EntityModel::Staff, Value::Object(payload)).await?;
        journal.created(&id);
        self.symbols.define(&staff.nn, &id, EntityKind::Staff)?;
        self.apply_meta(EntityModel::Staff, &id, meta).await?;
        journal.registered(Some(id))
    }

    async fn client(&self, client: &ClientSpec, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("client", client.nn.primary()));
        journal.advance(ActionState::Resolving)?;

        let payload = self.resolver().resolve_fields(&client.fields).await?;
        let meta = self.resolve_meta(client.meta.as_ref())?;

        journal.advance(ActionState::Submitting)?;
        let id = self.gateway.create_entity(EntityModel::Client, Value::Object(payload)).await?;
        journal.created(&id);
        self.symbols.define(&client.nn, &id, EntityKind::Client)?;
        self.apply_meta(EntityModel::Client, &id, meta).await?;
        journal.registered(Some(id))
    }

    async fn client_patch(&self, patch: &ClientPatch, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("clientPatch", patch.client.clone()));
        journal.advance(ActionState::Resolving)?;

        let id = self.symbols.resolve(&patch.client)?;
        let payload = self.resolver().resolve_fields(&patch.fields).await?;

        journal.advance(ActionState::Submitting)?;
        self.gateway
            .patch_entity(EntityModel::Client, &id, Value::Object(payload))
            .await?;
        journal.registered(Some(id))
    }

    async fn client_group(&self, group: &ClientGroupSpec, journal: &mut Journal) -> Result<(), MigrationError> {
        journal.begin(ActionLabel::new("clientGroup", subject(group.nn.as_ref(), &group.name)));
        journal.advance(ActionState::Resolving)?;

        let mut payload = self.resolver().resolve_fields(&group.fields).await?;
        let members = group
            .clients
            .iter()
            .map(|alias| self.symbols.resolve(alias).map(|id| Value::String(id.into_string())))
            .collect::<Result<Vec<_>, _>>()?;
        payload.insert("name".into(), Value::String(group.name.clone()));
        if !members.is_empty() {
            payload.insert("clients".into(), Value::Array(members));
        }
        let meta = self.resolve_meta(group.meta.as_ref())?;

        journal.advance(ActionState::Submitting)?;
        let id = self
            .gateway
            .create_entity(EntityModel::ClientGroup, Value::Object(payload))
            .await?;
        journal.created(&id);
        if let Some(nn) = &group.nn {
            self.symbols.define(nn, &id, EntityKind::ClientGroup)?;
        }
        self.apply_meta(EntityModel::ClientGroup, &id, meta).await?;
        journal.registered(Some(id))
    }

    async fn meeting(&self, index: usize, meeting: &MeetingSpec, journal: &mut Journal) -> Result<(), MigrationError> {
        let fallback = format!("#{}", index + 1);
        journal.begin(ActionLabel::new("meeting", subject(meeting.nn.as_ref(), &fallback)));
        journal.advance(ActionState::Resolving)?;

        let mut payload = self.resolver().resolve_fields(&meeting.fields).await?;
        let staff = self.attendants(&meeting.staff)?;
        let clients = self.attendants(&meeting.clients)?;
        if !staff.is_empty() {
            payload.insert("staff".into(), Value::Array(staff));
        }
        if !clients.is_empty() {
            payload.insert("clients".into(), Value::Array(clients));
        }
        let meta = self.resolve_meta(meeting.meta.as_ref())?;

        journal.advance(ActionState::Submitting)?;
        let id = self
            .gateway
            .create_entity(EntityModel::Meeting, Value::Object(payload))
            .await?;
        journal.created(&id);
        if let Some(nn) = &meeting.nn {
            self.symbols.define(nn, &id, EntityKind::Meeting)?;
        }
        self.apply_meta(EntityModel::Meeting, &id, meta).await?;
        journal.registered(Some(id))
    }

    fn attendants(&self, attendants: &[Attendant]) -> Result<Vec<Value>, MigrationError> {
        attendants
            .iter()
            .map(|attendant| {
                let id = self.symbols.resolve(&attendant.alias)?;
                let mut entry = Map::new();
                entry.insert("id".into(), json!(id));
                if let Some(attendance) = &attendant.attendance {
                    entry.insert("attendance".into(), Value::String(attendance.clone()));
                }
                Ok(Value::Object(entry))
            })
            .collect()
    }

    fn resolve_meta(&self, meta: Option<&MetaOverride>) -> Result<Option<ResolvedMeta>, MigrationError> {
        let Some(meta) = meta else {
            return Ok(None);
        };
        let author = |alias: &Option<String>| alias.as_deref().map(|a| self.symbols.resolve(a)).transpose();

        Ok(Some(ResolvedMeta {
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            created_by: author(&meta.created_by)?,
            updated_by: author(&meta.updated_by)?,
        }))
    }

    async fn apply_meta(&self, model: EntityModel, id: &RemoteId, meta: Option<ResolvedMeta>) -> Result<(), MigrationError> {
        let Some(meta) = meta else {
            return Ok(());
        };
        self.gateway
            .overwrite_metadata(&MetaPayload {
                model,
                id: id.clone(),
                created_at: meta.created_at,
                updated_at: meta.updated_at,
                created_by: meta.created_by,
                updated_by: meta.updated_by,
            })
            .await?;
        tracing::debug!(id = %id, "metadata overwritten");
        Ok(())
    }
}

/// Metadata override with author aliases already resolved
#[derive(Debug)]
struct ResolvedMeta {
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    created_by: Option<RemoteId>,
    updated_by: Option<RemoteId>,
}

/// Action journal for one run
#[derive(Debug, Default)]
struct Journal {
    report: RunReport,
    current: Option<InFlight>,
}

/// The action currently being applied
#[derive(Debug)]
struct InFlight {
    label: ActionLabel,
    state: ActionState,
    /// Remote identity once submission succeeded
    id: Option<RemoteId>,
}

impl Journal {
    fn begin(&mut self, label: ActionLabel) {
        tracing::debug!(action = %label, "action started");
        self.current = Some(InFlight {
            label,
            state: ActionState::Pending,
            id: None,
        });
    }

    fn advance(&mut self, to: ActionState) -> Result<(), MigrationError> {
        let Some(action) = self.current.as_mut() else {
            return Err(MigrationError::InvalidTransition {
                from: ActionState::Registered,
                to,
            });
        };
        validate_transition(action.state, to)?;
        action.state = to;
        Ok(())
    }

    /// The remote side now holds `id`; kept even if a later step fails
    fn created(&mut self, id: &RemoteId) {
        if let Some(action) = self.current.as_mut() {
            action.id = Some(id.clone());
        }
    }

    fn registered(&mut self, id: Option<RemoteId>) -> Result<(), MigrationError> {
        self.advance(ActionState::Registered)?;
        if let Some(action) = self.current.take() {
            let id = id.or(action.id);
            tracing::debug!(action = %action.label, id = ?id.as_ref().map(RemoteId::as_str), "action registered");
            self.report.actions.push(ActionRecord {
                label: action.label,
                state: action.state,
                id,
            });
        }
        Ok(())
    }

    fn fail(mut self, error: MigrationError, symbols: usize) -> RunFailure {
        let action = self.current.take().unwrap_or_else(|| InFlight {
            label: ActionLabel::new("run", "-"),
            state: ActionState::Pending,
            id: None,
        });
        let state = if validate_transition(action.state, ActionState::Failed).is_ok() {
            ActionState::Failed
        } else {
            action.state
        };

        tracing::error!(
            action = %action.label,
            created = ?action.id.as_ref().map(RemoteId::as_str),
            error = %error,
            "migration aborted"
        );
        self.report.actions.push(ActionRecord {
            label: action.label.clone(),
            state,
            id: action.id,
        });
        self.report.symbols = symbols;
        RunFailure {
            error,
            action: action.label,
            report: self.report,
        }
    }
}

fn subject(nn: Option<&Aliases>, fallback: &str) -> String {
    nn.map_or_else(|| fallback.to_string(), |aliases| aliases.primary().to_string())
}
