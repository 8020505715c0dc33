//! Errors returned by the Fabric API client

use fabric_core::provider::{ErrorKind, ProviderError};
use fabric_core::waiter::WaitError;
use serde::Deserialize;

/// Single business error reported by the Fabric API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplicationError {
    #[serde(rename = "errorCode", default)]
    pub code: String,
    #[serde(rename = "errorMessage", default)]
    pub message: String,
    #[serde(default)]
    pub property: Option<String>,
}

impl std::fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref property) = self.property {
            write!(f, " (property: {})", property)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Fabric API error (HTTP {status}): {}", format_errors(.errors))]
    Application {
        status: u16,
        errors: Vec<ApplicationError>,
    },

    #[error("Cannot decode API response: {message}")]
    Deserialization { message: String, body: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Invalid provider configuration: {message}")]
    Configuration { message: String },
}

fn format_errors(errors: &[ApplicationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// Whether the API reported an application error with the given code
    pub fn has_application_error_code(&self, code: &str) -> bool {
        match self {
            ApiError::Application { errors, .. } => errors.iter().any(|e| e.code == code),
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Application { .. } => ErrorKind::Application,
            ApiError::Transport(_) | ApiError::Deserialization { .. } | ApiError::Url(_) => {
                ErrorKind::Transport
            }
            ApiError::Authentication { .. } => ErrorKind::Credentials,
            ApiError::Configuration { .. } => ErrorKind::Validation,
        }
    }

    /// Wrap into a provider error carrying `message` as context
    pub fn into_provider_error(self, message: impl Into<String>) -> ProviderError {
        ProviderError::new(self.kind(), message).with_cause(self)
    }
}

/// Convert a failed wait into a provider error carrying `message` as context
pub fn wait_failed(err: WaitError<ApiError>, message: impl Into<String>) -> ProviderError {
    match err {
        WaitError::Refresh(e) => e.into_provider_error(message),
        WaitError::Timeout { .. } => ProviderError::new(ErrorKind::Timeout, message).with_cause(err),
        WaitError::UnexpectedState { .. } => {
            ProviderError::new(ErrorKind::UnexpectedState, message).with_cause(err)
        }
        WaitError::Cancelled => ProviderError::new(ErrorKind::Cancelled, message).with_cause(err),
    }
}
