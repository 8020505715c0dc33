//! Lifecycle of `ecx_l2_connection`
//!
//! A connection is created either alone or together with a secondary
//! connection of a redundant pair. Provisioning and deprovisioning run
//! asynchronously on the remote side; both are reconciled by polling the
//! primary connection's status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fabric_core::diagnostics::Diagnostic;
use fabric_core::provider::{OperationContext, ProviderError, ProviderResult};
use fabric_core::resource::{Resource, ResourceId, State, Value};
use fabric_core::schema::ResourceSchema;
use fabric_core::waiter::StateWaiter;
use log::{info, warn};

use crate::client::FabricApi;
use crate::error::{ApiError, wait_failed};
use crate::mapper::{self, Field};
use crate::model::{ConnectionStatus, L2Connection};
use crate::schemas::connection_schema;

pub const RESOURCE_TYPE: &str = "ecx_l2_connection";

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const POLL_DELAY: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Application error code meaning "connection already deleted"
pub const ALREADY_DELETED: &str = "IC-LAYER2-4021";

/// Status of a connection as seen by the poller; missing maps to ""
pub(crate) fn status_of(status: &Option<ConnectionStatus>) -> ConnectionStatus {
    status
        .clone()
        .unwrap_or_else(|| ConnectionStatus::Other(String::new()))
}

/// Check a configuration against the schema, collecting every problem
pub(crate) fn validate_schema(
    schema: &ResourceSchema,
    id: &ResourceId,
    attributes: &HashMap<String, Value>,
) -> ProviderResult<()> {
    schema.validate(attributes).map_err(|errors| {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ProviderError::validation(message).for_resource(id.clone())
    })
}

/// Manages `ecx_l2_connection` resources
pub struct L2ConnectionResource {
    api: Arc<dyn FabricApi>,
}

impl L2ConnectionResource {
    pub fn new(api: Arc<dyn FabricApi>) -> Self {
        Self { api }
    }

    fn api_error(&self, id: &ResourceId, err: ApiError, message: String) -> ProviderError {
        err.into_provider_error(message).for_resource(id.clone())
    }

    // =========================================================================
    // Create
    // =========================================================================

    pub async fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let id = &resource.id;
        validate_schema(&connection_schema(), id, &resource.attributes)?;
        let (primary, secondary) = mapper::expand_connection(&resource.attributes)
            .map_err(|e| e.for_resource(id.clone()))?;

        let primary_id = match secondary {
            Some(ref secondary) => {
                let (primary_id, secondary_id) = self
                    .api
                    .create_redundant_connection(&primary, secondary)
                    .await
                    .map_err(|e| {
                        self.api_error(id, e, "failed to create redundant connection".into())
                    })?;
                info!(
                    "[{}] created redundant connection {} (secondary {})",
                    id, primary_id, secondary_id
                );
                primary_id
            }
            None => {
                let primary_id = self
                    .api
                    .create_connection(&primary)
                    .await
                    .map_err(|e| self.api_error(id, e, "failed to create connection".into()))?;
                info!("[{}] created connection {}", id, primary_id);
                primary_id
            }
        };

        self.wait_for_provisioning(ctx, &primary_id)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        let created = State::existing(id.clone(), resource.attributes.clone())
            .with_identifier(primary_id.clone());
        self.read(ctx, &created).await
    }

    async fn wait_for_provisioning(
        &self,
        ctx: &OperationContext,
        uuid: &str,
    ) -> ProviderResult<L2Connection> {
        let waiter = StateWaiter::new(
            vec![
                ConnectionStatus::Provisioning,
                ConnectionStatus::PendingAutoApproval,
            ],
            vec![
                ConnectionStatus::Provisioned,
                ConnectionStatus::PendingApproval,
                ConnectionStatus::PendingBgpPeering,
                ConnectionStatus::PendingProviderVlan,
            ],
        )
        .timeout(ctx.timeouts.create_or(DEFAULT_CREATE_TIMEOUT))
        .delay(POLL_DELAY)
        .interval(POLL_INTERVAL);

        waiter
            .wait(&ctx.cancellation, || self.refresh_status(uuid))
            .await
            .map_err(|e| {
                wait_failed(
                    e,
                    format!("error waiting for connection ({}) to be created", uuid),
                )
            })
    }

    async fn refresh_status(
        &self,
        uuid: &str,
    ) -> Result<(L2Connection, ConnectionStatus), ApiError> {
        let conn = self.api.get_connection(uuid).await?;
        let status = status_of(&conn.status);
        Ok((conn, status))
    }

    // =========================================================================
    // Read
    // =========================================================================

    pub async fn read(&self, _ctx: &OperationContext, prior: &State) -> ProviderResult<State> {
        let id = &prior.id;
        let Some(uuid) = prior.identifier.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(State::not_found(id.clone()));
        };

        let primary = self.api.get_connection(uuid).await.map_err(|e| {
            self.api_error(id, e, "cannot fetch primary connection".into())
        })?;

        if let Some(ref status) = primary.status
            && status.is_deletion()
        {
            info!("[{}] connection {} is {}, removing from state", id, uuid, status);
            return Ok(State::not_found(id.clone()));
        }

        let secondary = match primary.redundant_uuid() {
            Some(redundant_uuid) => Some(self.api.get_connection(redundant_uuid).await.map_err(
                |e| self.api_error(id, e, "cannot fetch secondary connection".into()),
            )?),
            None => None,
        };

        let attributes = mapper::flatten_connection(&primary, secondary.as_ref(), &prior.attributes);
        Ok(State::existing(id.clone(), attributes).with_identifier(uuid))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Apply changes of name, speed and speed unit in place
    pub async fn update(
        &self,
        ctx: &OperationContext,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let id = &to.id;
        let uuid = from.identifier.as_deref().ok_or_else(|| {
            ProviderError::validation("cannot update a connection without identifier")
                .for_resource(id.clone())
        })?;
        validate_schema(&connection_schema(), id, &to.attributes)?;
        mapper::expand_connection(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;

        let changes = mapper::updatable_changes(&from.attributes, &to.attributes);
        if !changes.is_empty() {
            info!("[{}] updating connection {}: {:?}", id, uuid, changes);
        }
        self.api
            .new_update_request(uuid)
            .with_changes(changes)
            .execute()
            .await
            .map_err(|e| self.api_error(id, e, format!("failed to update connection {}", uuid)))?;

        if let Some(redundant_uuid) = from.get_string(Field::RedundantUuid.name()) {
            let changes = mapper::secondary_updatable_changes(&from.attributes, &to.attributes);
            if !changes.is_empty() {
                info!(
                    "[{}] updating secondary connection {}: {:?}",
                    id, redundant_uuid, changes
                );
            }
            self.api
                .new_update_request(redundant_uuid)
                .with_changes(changes)
                .execute()
                .await
                .map_err(|e| {
                    self.api_error(
                        id,
                        e,
                        format!("failed to update secondary connection {}", redundant_uuid),
                    )
                })?;
        }

        let updated = State {
            id: id.clone(),
            ..from.clone()
        };
        self.read(ctx, &updated).await
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the connection and its secondary.
    ///
    /// A failure to delete the secondary is reported as a warning.
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        state: &State,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let id = &state.id;
        let Some(uuid) = state.identifier.as_deref() else {
            return Ok(vec![]);
        };

        match self.api.delete_connection(uuid).await {
            Ok(()) => info!("[{}] deleting connection {}", id, uuid),
            Err(e) if e.has_application_error_code(ALREADY_DELETED) => {
                info!("[{}] connection {} was already deleted", id, uuid);
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(self.api_error(id, e, format!("failed to delete connection {}", uuid)));
            }
        }

        let mut diagnostics = Vec::new();
        if let Some(redundant_uuid) = state.get_string(Field::RedundantUuid.name()) {
            if let Err(e) = self.api.delete_connection(redundant_uuid).await {
                warn!(
                    "[{}] failed to remove secondary connection {}: {}",
                    id, redundant_uuid, e
                );
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "Failed to remove secondary connection with UUID {:?}",
                        redundant_uuid
                    ))
                    .with_detail(e.to_string())
                    .at_attribute(Field::RedundantUuid.name()),
                );
            }
        }

        self.wait_for_removal(ctx, uuid)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        Ok(diagnostics)
    }

    async fn wait_for_removal(&self, ctx: &OperationContext, uuid: &str) -> ProviderResult<()> {
        let waiter = StateWaiter::new(
            vec![ConnectionStatus::Deprovisioning],
            vec![
                ConnectionStatus::PendingDelete,
                ConnectionStatus::Deprovisioned,
            ],
        )
        .timeout(ctx.timeouts.delete_or(DEFAULT_DELETE_TIMEOUT))
        .delay(POLL_DELAY)
        .interval(POLL_INTERVAL);

        waiter
            .wait(&ctx.cancellation, || self.refresh_status(uuid))
            .await
            .map(|_| ())
            .map_err(|e| {
                wait_failed(
                    e,
                    format!("error waiting for connection ({}) to be removed", uuid),
                )
            })
    }
}
