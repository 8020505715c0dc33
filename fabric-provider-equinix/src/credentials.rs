//! Credential Resolver - AWS key pair used to accept connections
//!
//! Credentials are looked up through an ordered chain of sources: explicit
//! values from configuration, the standard environment variables, then the
//! shared credentials file. The first source yielding a complete pair wins.

use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::Credentials;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use log::debug;

/// Resolved AWS key pair
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Always empty; temporary credentials are not supported
    pub session_token: String,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no valid AWS credentials found (tried: {})", .tried.join(", "))]
pub struct CredentialResolutionError {
    pub tried: Vec<String>,
}

/// Ordered chain of credential sources
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    sources: Vec<(String, SharedCredentialsProvider)>,
}

impl CredentialResolver {
    /// Standard chain: explicit keys (only when both are non-empty), the
    /// environment, then the shared credentials file.
    pub fn standard(access_key: &str, secret_key: &str, profile: Option<&str>) -> Self {
        let mut sources = Vec::new();

        if !access_key.is_empty() && !secret_key.is_empty() {
            let creds = Credentials::new(access_key, secret_key, None, None, "Static");
            sources.push(("static".to_string(), SharedCredentialsProvider::new(creds)));
        }

        sources.push((
            "environment".to_string(),
            SharedCredentialsProvider::new(EnvironmentVariableCredentialsProvider::new()),
        ));

        let profile = profile.filter(|p| !p.is_empty());
        let mut builder = ProfileFileCredentialsProvider::builder();
        if let Some(name) = profile {
            builder = builder.profile_name(name);
        }
        sources.push((
            format!("shared-credentials-file({})", profile.unwrap_or("default")),
            SharedCredentialsProvider::new(builder.build()),
        ));

        Self { sources }
    }

    /// Build a chain from explicit sources, tried in the given order
    pub fn from_sources(sources: Vec<(String, SharedCredentialsProvider)>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Return credentials from the first source that yields a complete pair
    pub async fn resolve(&self) -> Result<AwsCredentials, CredentialResolutionError> {
        for (name, provider) in &self.sources {
            match provider.provide_credentials().await {
                Ok(creds)
                    if !creds.access_key_id().is_empty()
                        && !creds.secret_access_key().is_empty() =>
                {
                    debug!("Using AWS credentials from {}", name);
                    return Ok(AwsCredentials {
                        access_key_id: creds.access_key_id().to_string(),
                        secret_access_key: creds.secret_access_key().to_string(),
                        session_token: String::new(),
                    });
                }
                Ok(_) => debug!("AWS credential source {} returned an empty key", name),
                Err(e) => debug!("AWS credential source {} failed: {}", name, e),
            }
        }

        Err(CredentialResolutionError {
            tried: self.sources.iter().map(|(name, _)| name.clone()).collect(),
        })
    }
}
