//! Fabric Equinix Provider
//!
//! Manages Equinix Fabric layer 2 connections and their provider-side
//! acceptance.
//!
//! ## Module Structure
//!
//! - `l2_connection` / `l2_connection_accepter` - Lifecycle of each resource type
//! - `mapper` - Attribute names and conversion to/from the API model
//! - `schemas` - Attribute schemas and validation rules
//! - `credentials` - AWS credential chain used by the accepter
//! - `client` / `rest` - Fabric API abstraction and its REST implementation
//! - `config` - Provider configuration and authentication

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod l2_connection;
pub mod l2_connection_accepter;
pub mod mapper;
pub mod model;
pub mod resources;
pub mod rest;
pub mod schemas;

use std::sync::Arc;

use fabric_core::diagnostics::Diagnostic;
use fabric_core::provider::{
    BoxFuture, OperationContext, Provider, ProviderError, ProviderResult, ResourceType,
};
use fabric_core::resource::{Resource, ResourceId, State};

pub use client::FabricApi;
pub use config::Config;
pub use error::ApiError;
pub use rest::RestClient;

use l2_connection::L2ConnectionResource;
use l2_connection_accepter::L2ConnectionAccepterResource;
use resources::resource_types;

/// Equinix Fabric Provider
pub struct EquinixProvider {
    connection: L2ConnectionResource,
    accepter: L2ConnectionAccepterResource,
}

impl EquinixProvider {
    pub fn new(api: Arc<dyn FabricApi>) -> Self {
        Self {
            connection: L2ConnectionResource::new(api.clone()),
            accepter: L2ConnectionAccepterResource::new(api),
        }
    }

    /// Authenticate against the Fabric API described by `config`
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = config.load().await?;
        Ok(Self::new(Arc::new(client)))
    }
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::validation(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for EquinixProvider {
    fn name(&self) -> &'static str {
        "equinix"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(&self, ctx: &OperationContext, prior: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let prior = prior.clone();
        Box::pin(async move {
            match prior.id.resource_type.as_str() {
                l2_connection::RESOURCE_TYPE => self.connection.read(&ctx, &prior).await,
                l2_connection_accepter::RESOURCE_TYPE => self.accepter.read(&ctx, &prior).await,
                _ => Err(unknown_type(&prior.id)),
            }
        })
    }

    fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                l2_connection::RESOURCE_TYPE => self.connection.create(&ctx, &resource).await,
                l2_connection_accepter::RESOURCE_TYPE => {
                    self.accepter.create(&ctx, &resource).await
                }
                _ => Err(unknown_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        ctx: &OperationContext,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match to.id.resource_type.as_str() {
                l2_connection::RESOURCE_TYPE => self.connection.update(&ctx, &from, &to).await,
                l2_connection_accepter::RESOURCE_TYPE => {
                    self.accepter.update(&ctx, &from, &to).await
                }
                _ => Err(unknown_type(&to.id)),
            }
        })
    }

    fn delete(
        &self,
        ctx: &OperationContext,
        state: &State,
    ) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>> {
        let ctx = ctx.clone();
        let state = state.clone();
        Box::pin(async move {
            match state.id.resource_type.as_str() {
                l2_connection::RESOURCE_TYPE => self.connection.delete(&ctx, &state).await,
                l2_connection_accepter::RESOURCE_TYPE => self.accepter.delete(&ctx, &state).await,
                _ => Err(unknown_type(&state.id)),
            }
        })
    }
}
