//! REST implementation of [`FabricApi`] over the ECX v3 endpoints
//!
//! Base path: `/ecx/v3/l2/connections`
//! Auth: bearer token injected as a default header by [`crate::config::Config::load`]

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use url::Url;

use crate::client::{ApiResult, FabricApi};
use crate::error::{ApiError, ApplicationError};
use crate::model::{ConnectionConfirmation, ConnectionUpdate, L2Connection};

const CONNECTIONS_PATH: &str = "ecx/v3/l2/connections";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    #[serde(default)]
    primary_connection_id: Option<String>,
    #[serde(default)]
    secondary_connection_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    List(Vec<ApplicationError>),
    Wrapped { errors: Vec<ApplicationError> },
    Single(ApplicationError),
}

/// Async client for the Fabric layer 2 connection API
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Wrap an existing `reqwest::Client` (caller manages auth headers)
    pub fn new(base_url: &str, http: reqwest::Client) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// URL of one connection; the id is a single percent-encoded path segment
    fn connection_url(&self, uuid: &str) -> ApiResult<Url> {
        // `push` drops dot segments instead of encoding them
        if matches!(uuid, "" | "." | "..") {
            return Err(ApiError::Configuration {
                message: format!("invalid connection id {uuid:?}"),
            });
        }
        let mut url = self.url(CONNECTIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(uuid);
        Ok(url)
    }

    // =========================================================================
    // HTTP verbs
    // =========================================================================

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &JsonValue) -> ApiResult<T> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        handle_response(resp).await
    }

    async fn patch(&self, url: Url, params: &[(&str, &str)], body: &JsonValue) -> ApiResult<()> {
        debug!("PATCH {url} params={params:?}");

        let resp = self.http.patch(url).query(params).json(body).send().await?;
        handle_empty(resp).await
    }

    async fn delete(&self, url: Url) -> ApiResult<()> {
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        handle_empty(resp).await
    }
}

/// Ensure the base URL ends with `/` so relative paths join below it
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

// =============================================================================
// Response handling
// =============================================================================

pub(crate) async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            ApiError::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> ApiResult<()> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> ApiError {
    let raw = match resp.text().await {
        Ok(raw) => raw,
        Err(e) => return ApiError::Transport(e),
    };

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ApiError::Authentication {
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
        };
    }

    let errors = match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(ErrorBody::List(errors)) | Ok(ErrorBody::Wrapped { errors }) => errors,
        Ok(ErrorBody::Single(error)) => vec![error],
        Err(_) => vec![ApplicationError {
            code: String::new(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
            property: None,
        }],
    };

    ApiError::Application {
        status: status.as_u16(),
        errors,
    }
}

// =============================================================================
// Request bodies
// =============================================================================

fn insert_str(body: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        body.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn insert_int(body: &mut Map<String, JsonValue>, key: &str, value: Option<i64>) {
    if let Some(v) = value {
        body.insert(key.to_string(), JsonValue::from(v));
    }
}

/// Fields shared by the primary and secondary side, keyed with `prefix`
fn insert_side(body: &mut Map<String, JsonValue>, prefix: &str, conn: &L2Connection) {
    let key = |name: &str| format!("{prefix}{name}");
    insert_str(body, &key("Name"), &conn.name);
    insert_str(body, &key("PortUUID"), &conn.port_uuid);
    insert_str(body, &key("VirtualDeviceUUID"), &conn.device_uuid);
    insert_int(body, &key("InterfaceId"), conn.device_interface_id);
    insert_int(body, &key("VlanSTag"), conn.vlan_stag);
    insert_int(body, &key("VlanCTag"), conn.vlan_ctag);
    insert_str(body, &key("ZSidePortUUID"), &conn.zside_port_uuid);
    insert_int(body, &key("ZSideVlanSTag"), conn.zside_vlan_stag);
    insert_int(body, &key("ZSideVlanCTag"), conn.zside_vlan_ctag);
}

/// Build the create request body for a primary and optional secondary
pub(crate) fn create_body(primary: &L2Connection, secondary: Option<&L2Connection>) -> JsonValue {
    let mut body = Map::new();
    insert_side(&mut body, "primary", primary);
    insert_str(&mut body, "profileUUID", &primary.profile_uuid);
    insert_int(&mut body, "speed", primary.speed);
    insert_str(&mut body, "speedUnit", &primary.speed_unit);
    if !primary.notifications.is_empty() {
        body.insert("notifications".to_string(), json!(primary.notifications));
    }
    insert_str(&mut body, "purchaseOrderNumber", &primary.purchase_order_number);
    insert_str(&mut body, "namedTag", &primary.named_tag);
    insert_str(&mut body, "sellerRegion", &primary.seller_region);
    insert_str(&mut body, "sellerMetroCode", &primary.seller_metro_code);
    insert_str(&mut body, "authorizationKey", &primary.authorization_key);
    if !primary.additional_info.is_empty() {
        body.insert("additionalInfo".to_string(), json!(primary.additional_info));
    }

    if let Some(secondary) = secondary {
        insert_side(&mut body, "secondary", secondary);
        insert_str(&mut body, "secondaryProfileUUID", &secondary.profile_uuid);
        insert_int(&mut body, "secondarySpeed", secondary.speed);
        insert_str(&mut body, "secondarySpeedUnit", &secondary.speed_unit);
        insert_str(&mut body, "secondarySellerRegion", &secondary.seller_region);
        insert_str(&mut body, "secondarySellerMetroCode", &secondary.seller_metro_code);
        insert_str(&mut body, "secondaryAuthorizationKey", &secondary.authorization_key);
    }

    JsonValue::Object(body)
}

fn missing_id(which: &str) -> ApiError {
    ApiError::Deserialization {
        message: format!("create response carries no {which} connection id"),
        body: String::new(),
    }
}

// =============================================================================
// FabricApi
// =============================================================================

#[async_trait]
impl FabricApi for RestClient {
    async fn create_connection(&self, connection: &L2Connection) -> ApiResult<String> {
        let resp: CreateResponse = self
            .post(self.url(CONNECTIONS_PATH)?, &create_body(connection, None))
            .await?;
        resp.primary_connection_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing_id("primary"))
    }

    async fn create_redundant_connection(
        &self,
        primary: &L2Connection,
        secondary: &L2Connection,
    ) -> ApiResult<(String, String)> {
        let resp: CreateResponse = self
            .post(
                self.url(CONNECTIONS_PATH)?,
                &create_body(primary, Some(secondary)),
            )
            .await?;
        let primary_id = resp
            .primary_connection_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing_id("primary"))?;
        let secondary_id = resp
            .secondary_connection_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing_id("secondary"))?;
        Ok((primary_id, secondary_id))
    }

    async fn get_connection(&self, uuid: &str) -> ApiResult<L2Connection> {
        self.get(self.connection_url(uuid)?).await
    }

    async fn delete_connection(&self, uuid: &str) -> ApiResult<()> {
        self.delete(self.connection_url(uuid)?).await
    }

    async fn update_connection(&self, uuid: &str, update: &ConnectionUpdate) -> ApiResult<()> {
        let url = self.connection_url(uuid)?;
        if let Some(ref name) = update.name {
            self.patch(
                url.clone(),
                &[("action", "update"), ("field", "name")],
                &json!({ "name": name }),
            )
            .await?;
        }
        if update.speed.is_some() || update.speed_unit.is_some() {
            let mut body = Map::new();
            insert_int(&mut body, "speed", update.speed);
            insert_str(&mut body, "speedUnit", &update.speed_unit);
            self.patch(
                url,
                &[("action", "update"), ("field", "speed")],
                &JsonValue::Object(body),
            )
            .await?;
        }
        Ok(())
    }

    async fn confirm_connection(
        &self,
        uuid: &str,
        confirmation: &ConnectionConfirmation,
    ) -> ApiResult<()> {
        let body = serde_json::to_value(confirmation).map_err(|e| ApiError::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        self.patch(
            self.connection_url(uuid)?,
            &[("action", "Approve")],
            &body,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://api.equinix.com").unwrap();
        assert_eq!(url.as_str(), "https://api.equinix.com/");
        let url = normalize_base_url("http://localhost:8080/proxy/").unwrap();
        assert_eq!(
            url.join(CONNECTIONS_PATH).unwrap().as_str(),
            "http://localhost:8080/proxy/ecx/v3/l2/connections"
        );
    }

    #[test]
    fn connection_id_stays_one_path_segment() {
        let client = RestClient::new("https://api.equinix.com/", reqwest::Client::new()).unwrap();
        assert_eq!(
            client.connection_url("c-1").unwrap().as_str(),
            "https://api.equinix.com/ecx/v3/l2/connections/c-1"
        );
        assert_eq!(
            client.connection_url("../../../evil").unwrap().path(),
            "/ecx/v3/l2/connections/..%2F..%2F..%2Fevil"
        );
        assert_eq!(
            client.connection_url("a/b?c#d").unwrap().path(),
            "/ecx/v3/l2/connections/a%2Fb%3Fc%23d"
        );
        for id in ["", ".", ".."] {
            assert!(
                matches!(client.connection_url(id), Err(ApiError::Configuration { .. })),
                "{id:?} accepted"
            );
        }
    }

    #[test]
    fn create_body_uses_prefixed_keys() {
        let primary = L2Connection {
            name: Some("primary".to_string()),
            port_uuid: Some("port-1".to_string()),
            vlan_stag: Some(100),
            speed: Some(50),
            speed_unit: Some("MB".to_string()),
            notifications: vec!["ops@example.com".to_string()],
            ..Default::default()
        };
        let secondary = L2Connection {
            name: Some("secondary".to_string()),
            device_uuid: Some("dev-2".to_string()),
            ..Default::default()
        };

        let body = create_body(&primary, Some(&secondary));
        assert_eq!(body["primaryName"], "primary");
        assert_eq!(body["primaryPortUUID"], "port-1");
        assert_eq!(body["primaryVlanSTag"], 100);
        assert_eq!(body["speed"], 50);
        assert_eq!(body["notifications"][0], "ops@example.com");
        assert_eq!(body["secondaryName"], "secondary");
        assert_eq!(body["secondaryVirtualDeviceUUID"], "dev-2");
        assert!(body.get("secondarySpeed").is_none());
    }
}
