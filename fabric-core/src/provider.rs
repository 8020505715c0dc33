//! Provider - Trait abstracting resource operations
//!
//! A Provider implements the create/read/update/delete lifecycle for the
//! resource types it owns, converting declared configuration into API calls.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::diagnostics::Diagnostic;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Broad category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration, rejected before any API call
    Validation,
    /// No credential source produced a usable key pair
    Credentials,
    /// Network failure or undecodable API response
    Transport,
    /// Business error reported by the remote API
    Application,
    /// A wait-for-state operation ran out of time
    Timeout,
    /// A wait-for-state operation observed a status outside pending/target
    UnexpectedState,
    /// The operation was cancelled by the caller
    Cancelled,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        let diag = Diagnostic::error(err.message.clone());
        match err.cause {
            Some(ref cause) => diag.with_detail(cause.to_string()),
            None => diag,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-operation timeouts configured on a resource.
///
/// `None` means "use the resource type's default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Option<Duration>,
    pub delete: Option<Duration>,
}

impl Timeouts {
    pub fn create_or(&self, default: Duration) -> Duration {
        self.create.unwrap_or(default)
    }

    pub fn delete_or(&self, default: Duration) -> Duration {
        self.delete.unwrap_or(default)
    }
}

/// Context of a single lifecycle invocation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub timeouts: Timeouts,
    /// Fired by the caller to abort long-running waits
    pub cancellation: CancellationToken,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "ecx_l2_connection")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects. Implementations clone
/// what they need from the arguments so the returned future only borrows
/// the provider itself.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "equinix")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Refresh a resource from its prior state
    ///
    /// Returns `State::not_found()` if the remote resource is gone or going
    /// away; the caller should then drop it from its own state.
    fn read(&self, ctx: &OperationContext, prior: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote identifier
    fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        ctx: &OperationContext,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// Non-fatal problems are returned as warning diagnostics.
    fn delete(
        &self,
        ctx: &OperationContext,
        state: &State,
    ) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>>;

    /// Import an existing resource by its remote identifier
    fn import(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let prior = State::existing(id.clone(), HashMap::new()).with_identifier(identifier);
        Box::pin(async move { self.read(&ctx, &prior).await })
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(&self, ctx: &OperationContext, prior: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(ctx, prior)
    }

    fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(ctx, resource)
    }

    fn update(
        &self,
        ctx: &OperationContext,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(ctx, from, to)
    }

    fn delete(
        &self,
        ctx: &OperationContext,
        state: &State,
    ) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>> {
        (**self).delete(ctx, state)
    }

    fn import(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(ctx, id, identifier)
    }
}
