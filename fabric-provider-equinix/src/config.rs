//! Provider configuration and authenticated client construction

use std::time::Duration;

use log::{debug, info};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::rest::{RestClient, handle_response, normalize_base_url};

pub const DEFAULT_BASE_URL: &str = "https://api.equinix.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN_PATH: &str = "oauth2/v1/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Connection settings for the Fabric API.
///
/// Either a static `token` or a `client_id`/`client_secret` pair is
/// required; a token takes precedence.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Config {
    pub fn validate(&self) -> Result<(), ApiError> {
        normalize_base_url(&self.base_url)?;
        if non_empty(&self.token).is_none()
            && (non_empty(&self.client_id).is_none() || non_empty(&self.client_secret).is_none())
        {
            return Err(ApiError::Configuration {
                message: "either a token or both client_id and client_secret must be set"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout to apply; zero selects [`DEFAULT_REQUEST_TIMEOUT`]
    pub fn effective_request_timeout(&self) -> Duration {
        if self.request_timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            self.request_timeout
        }
    }

    /// Validate the configuration and build an authenticated REST client.
    ///
    /// Without a static token this performs the OAuth2 client-credentials
    /// exchange first.
    pub async fn load(&self) -> Result<RestClient, ApiError> {
        self.validate()?;

        let token = match non_empty(&self.token) {
            Some(token) => token.to_string(),
            None => self.fetch_token().await?,
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            ApiError::Authentication {
                message: format!("invalid token header value: {e}"),
            }
        })?;
        value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.effective_request_timeout())
            .build()?;

        info!("Using Fabric API at {}", self.base_url);
        RestClient::new(&self.base_url, http)
    }

    async fn fetch_token(&self) -> Result<String, ApiError> {
        let url = normalize_base_url(&self.base_url)?.join(TOKEN_PATH)?;
        debug!("POST {url}");

        let http = reqwest::Client::builder()
            .timeout(self.effective_request_timeout())
            .build()?;
        let resp = http
            .post(url)
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id.as_deref().unwrap_or_default(),
                "client_secret": self.client_secret.as_deref().unwrap_or_default(),
            }))
            .send()
            .await?;

        let token: TokenResponse = handle_response(resp).await.map_err(|e| match e {
            ApiError::Application { errors, .. } => ApiError::Authentication {
                message: errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            },
            other => other,
        })?;
        if token.access_token.is_empty() {
            return Err(ApiError::Authentication {
                message: "token endpoint returned an empty access token".to_string(),
            });
        }
        Ok(token.access_token)
    }
}
