//! Lifecycle of `ecx_l2_connection_accepter`
//!
//! Accepting approves a pending connection on the provider (AWS) side. The
//! accepter owns no remote object of its own: deleting it leaves the
//! connection in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fabric_core::diagnostics::Diagnostic;
use fabric_core::provider::{ErrorKind, OperationContext, ProviderError, ProviderResult};
use fabric_core::resource::{Resource, ResourceId, State, Value};
use fabric_core::waiter::StateWaiter;
use log::{info, warn};

use crate::client::FabricApi;
use crate::credentials::{AwsCredentials, CredentialResolver};
use crate::error::{ApiError, wait_failed};
use crate::l2_connection::{status_of, validate_schema};
use crate::mapper::AccepterField;
use crate::model::{ConnectionConfirmation, ConnectionStatus};
use crate::schemas::accepter_schema;

pub const RESOURCE_TYPE: &str = "ecx_l2_connection_accepter";

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const POLL_DELAY: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

const CONFIRM_OPERATION: &str = "CONFIRM_CONNECTION";
const AWS_CONNECTION_ID_KEY: &str = "awsConnectionId";

fn attr<'a>(attrs: &'a HashMap<String, Value>, field: AccepterField) -> &'a str {
    attrs
        .get(field.name())
        .and_then(Value::as_str)
        .unwrap_or_default()
}

async fn resolve_credentials(
    id: &ResourceId,
    attrs: &HashMap<String, Value>,
) -> ProviderResult<AwsCredentials> {
    let profile = Some(attr(attrs, AccepterField::Profile)).filter(|p| !p.is_empty());
    CredentialResolver::standard(
        attr(attrs, AccepterField::AccessKey),
        attr(attrs, AccepterField::SecretKey),
        profile,
    )
    .resolve()
    .await
    .map_err(|e| {
        ProviderError::new(ErrorKind::Credentials, "error retrieving AWS credentials")
            .with_cause(e)
            .for_resource(id.clone())
    })
}

/// Manages `ecx_l2_connection_accepter` resources
pub struct L2ConnectionAccepterResource {
    api: Arc<dyn FabricApi>,
}

impl L2ConnectionAccepterResource {
    pub fn new(api: Arc<dyn FabricApi>) -> Self {
        Self { api }
    }

    pub async fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let id = &resource.id;
        validate_schema(&accepter_schema(), id, &resource.attributes)?;

        let creds = resolve_credentials(id, &resource.attributes).await?;
        let connection_id = attr(&resource.attributes, AccepterField::ConnectionId).to_string();

        self.api
            .confirm_connection(
                &connection_id,
                &ConnectionConfirmation {
                    access_key: creds.access_key_id.clone(),
                    secret_key: creds.secret_access_key.clone(),
                },
            )
            .await
            .map_err(|e| {
                e.into_provider_error(format!("failed to accept connection {}", connection_id))
                    .for_resource(id.clone())
            })?;
        info!("[{}] accepted connection {}", id, connection_id);

        let waiter = StateWaiter::new(
            vec![
                ConnectionStatus::Provisioning,
                ConnectionStatus::PendingApproval,
            ],
            vec![ConnectionStatus::Provisioned],
        )
        .timeout(ctx.timeouts.create_or(DEFAULT_CREATE_TIMEOUT))
        .delay(POLL_DELAY)
        .interval(POLL_INTERVAL);

        waiter
            .wait(&ctx.cancellation, || async {
                let conn = self.api.get_connection(&connection_id).await?;
                let status = status_of(&conn.provider_status);
                Ok::<_, ApiError>((conn, status))
            })
            .await
            .map_err(|e| {
                wait_failed(
                    e,
                    format!(
                        "error waiting for connection {:?} to be provisioned on provider side",
                        connection_id
                    ),
                )
                .for_resource(id.clone())
            })?;

        let mut attributes = resource.attributes.clone();
        attributes.insert(
            AccepterField::AccessKey.name().to_string(),
            Value::String(creds.access_key_id),
        );
        attributes.insert(
            AccepterField::SecretKey.name().to_string(),
            Value::String(creds.secret_access_key),
        );
        let accepted = State::existing(id.clone(), attributes).with_identifier(connection_id);
        self.read(ctx, &accepted).await
    }

    pub async fn read(&self, _ctx: &OperationContext, prior: &State) -> ProviderResult<State> {
        let id = &prior.id;
        let Some(uuid) = prior.identifier.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(State::not_found(id.clone()));
        };

        let conn = self.api.get_connection(uuid).await.map_err(|e| {
            e.into_provider_error("cannot fetch connection")
                .for_resource(id.clone())
        })?;
        if let Some(ref status) = conn.status
            && status.is_deletion()
        {
            info!("[{}] connection {} is {}, removing from state", id, uuid, status);
            return Ok(State::not_found(id.clone()));
        }

        let creds = resolve_credentials(id, &prior.attributes).await?;

        let mut attributes = HashMap::new();
        attributes.insert(
            AccepterField::ConnectionId.name().to_string(),
            Value::String(conn.uuid.clone().unwrap_or_else(|| uuid.to_string())),
        );
        attributes.insert(
            AccepterField::AccessKey.name().to_string(),
            Value::String(creds.access_key_id),
        );
        attributes.insert(
            AccepterField::SecretKey.name().to_string(),
            Value::String(creds.secret_access_key),
        );
        if let Some(profile) = prior.get_string(AccepterField::Profile.name()) {
            attributes.insert(
                AccepterField::Profile.name().to_string(),
                Value::from(profile),
            );
        }
        if let Some(aws_id) = conn.action_data(CONFIRM_OPERATION, AWS_CONNECTION_ID_KEY) {
            attributes.insert(
                AccepterField::AwsConnectionId.name().to_string(),
                Value::from(aws_id),
            );
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(uuid))
    }

    /// Every accepter attribute forces replacement, so nothing can change
    /// in place.
    pub async fn update(
        &self,
        _ctx: &OperationContext,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        Err(ProviderError::validation(
            "connection accepter cannot be updated in place; replace it instead",
        )
        .for_resource(to.id.clone()))
    }

    /// Forget the accepter. The connection stays on the remote side.
    pub async fn delete(
        &self,
        _ctx: &OperationContext,
        state: &State,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let uuid = state.identifier.as_deref().unwrap_or_default();
        warn!(
            "[{}] will not delete connection {}; it is only removed from state",
            state.id, uuid
        );
        Ok(vec![
            Diagnostic::warning(format!(
                "Connection {:?} was not deleted and remains on the remote side",
                uuid
            ))
            .with_detail("Removing the accepter only drops it from state")
            .at_attribute(AccepterField::ConnectionId.name()),
        ])
    }
}
