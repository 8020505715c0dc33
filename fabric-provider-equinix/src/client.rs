//! Fabric API client abstraction
//!
//! The lifecycle manager only talks to the remote API through [`FabricApi`],
//! so tests can substitute an in-memory implementation for the REST client.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{ConnectionConfirmation, ConnectionUpdate, L2Connection};

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations on layer 2 connections
#[async_trait]
pub trait FabricApi: Send + Sync {
    /// Create a single connection, returning its UUID
    async fn create_connection(&self, connection: &L2Connection) -> ApiResult<String>;

    /// Create a primary and secondary connection in one call, returning
    /// `(primary_uuid, secondary_uuid)`
    async fn create_redundant_connection(
        &self,
        primary: &L2Connection,
        secondary: &L2Connection,
    ) -> ApiResult<(String, String)>;

    async fn get_connection(&self, uuid: &str) -> ApiResult<L2Connection>;

    async fn delete_connection(&self, uuid: &str) -> ApiResult<()>;

    /// Apply an in-place modification. Prefer [`UpdateRequest`] over calling
    /// this directly.
    async fn update_connection(&self, uuid: &str, update: &ConnectionUpdate) -> ApiResult<()>;

    /// Approve a pending connection on the provider side
    async fn confirm_connection(
        &self,
        uuid: &str,
        confirmation: &ConnectionConfirmation,
    ) -> ApiResult<()>;
}

impl dyn FabricApi + '_ {
    /// Start building an update of connection `uuid`
    pub fn new_update_request(&self, uuid: impl Into<String>) -> UpdateRequest<'_> {
        UpdateRequest {
            api: self,
            uuid: uuid.into(),
            update: ConnectionUpdate::default(),
        }
    }
}

/// Builder for an in-place connection update
pub struct UpdateRequest<'a> {
    api: &'a dyn FabricApi,
    uuid: String,
    update: ConnectionUpdate,
}

impl UpdateRequest<'_> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.update.name = Some(name.into());
        self
    }

    pub fn with_speed(mut self, speed: i64) -> Self {
        self.update.speed = Some(speed);
        self
    }

    pub fn with_speed_unit(mut self, speed_unit: impl Into<String>) -> Self {
        self.update.speed_unit = Some(speed_unit.into());
        self
    }

    /// Apply all changes of `update` on top of this request
    pub fn with_changes(mut self, update: ConnectionUpdate) -> Self {
        if let Some(name) = update.name {
            self.update.name = Some(name);
        }
        if let Some(speed) = update.speed {
            self.update.speed = Some(speed);
        }
        if let Some(speed_unit) = update.speed_unit {
            self.update.speed_unit = Some(speed_unit);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.update.is_empty()
    }

    /// Send the update. An empty request sends nothing.
    pub async fn execute(self) -> ApiResult<()> {
        if self.update.is_empty() {
            return Ok(());
        }
        self.api.update_connection(&self.uuid, &self.update).await
    }
}
