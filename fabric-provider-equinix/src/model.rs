//! Typed model of the Equinix Fabric layer 2 connection API object

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provisioning status of a connection, used for both `status` and
/// `providerStatus`.
///
/// Unknown values are kept in [`ConnectionStatus::Other`] so that a status
/// introduced by the API is reported as unexpected instead of failing to
/// decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    Provisioning,
    Provisioned,
    PendingApproval,
    PendingAutoApproval,
    PendingBgpPeering,
    PendingProviderVlan,
    Deprovisioning,
    Deprovisioned,
    PendingDelete,
    Deleted,
    Other(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Provisioning => "PROVISIONING",
            ConnectionStatus::Provisioned => "PROVISIONED",
            ConnectionStatus::PendingApproval => "PENDING_APPROVAL",
            ConnectionStatus::PendingAutoApproval => "PENDING_AUTO_APPROVAL",
            ConnectionStatus::PendingBgpPeering => "PENDING_BGP_PEERING",
            ConnectionStatus::PendingProviderVlan => "PENDING_PROVIDER_VLAN",
            ConnectionStatus::Deprovisioning => "DEPROVISIONING",
            ConnectionStatus::Deprovisioned => "DEPROVISIONED",
            ConnectionStatus::PendingDelete => "PENDING_DELETE",
            ConnectionStatus::Deleted => "DELETED",
            ConnectionStatus::Other(s) => s.as_str(),
        }
    }

    /// Statuses meaning the connection is gone or going away
    pub const DELETION: [ConnectionStatus; 4] = [
        ConnectionStatus::PendingDelete,
        ConnectionStatus::Deprovisioning,
        ConnectionStatus::Deprovisioned,
        ConnectionStatus::Deleted,
    ];

    pub fn is_deletion(&self) -> bool {
        Self::DELETION.contains(self)
    }
}

impl From<&str> for ConnectionStatus {
    fn from(value: &str) -> Self {
        match value {
            "PROVISIONING" => ConnectionStatus::Provisioning,
            "PROVISIONED" => ConnectionStatus::Provisioned,
            "PENDING_APPROVAL" => ConnectionStatus::PendingApproval,
            "PENDING_AUTO_APPROVAL" => ConnectionStatus::PendingAutoApproval,
            "PENDING_BGP_PEERING" => ConnectionStatus::PendingBgpPeering,
            "PENDING_PROVIDER_VLAN" => ConnectionStatus::PendingProviderVlan,
            "DEPROVISIONING" => ConnectionStatus::Deprovisioning,
            "DEPROVISIONED" => ConnectionStatus::Deprovisioned,
            "PENDING_DELETE" => ConnectionStatus::PendingDelete,
            "DELETED" => ConnectionStatus::Deleted,
            other => ConnectionStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ConnectionStatus {
    fn from(value: String) -> Self {
        ConnectionStatus::from(value.as_str())
    }
}

impl From<ConnectionStatus> for String {
    fn from(value: ConnectionStatus) -> Self {
        match value {
            ConnectionStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form name/value pair attached to a connection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub name: String,
    pub value: String,
}

/// Data item the provider side needs to complete an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequiredData {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Pending action on a connection (e.g. provider-side confirmation)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAction {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub required_data: Vec<ActionRequiredData>,
}

/// Layer 2 connection as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "sellerServiceProfileUUID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_order_number: Option<String>,
    #[serde(rename = "portUUID", default, skip_serializing_if = "Option::is_none")]
    pub port_uuid: Option<String>,
    #[serde(
        rename = "virtualDeviceUUID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub device_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_interface_id: Option<i64>,
    #[serde(rename = "vlanSTag", default, skip_serializing_if = "Option::is_none")]
    pub vlan_stag: Option<i64>,
    #[serde(rename = "vlanCTag", default, skip_serializing_if = "Option::is_none")]
    pub vlan_ctag: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_info: Vec<AdditionalInfo>,
    #[serde(
        rename = "zSidePortUUID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub zside_port_uuid: Option<String>,
    #[serde(
        rename = "zSideVlanSTag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub zside_vlan_stag: Option<i64>,
    #[serde(
        rename = "zSideVlanCTag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub zside_vlan_ctag: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_metro_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_key: Option<String>,
    #[serde(
        rename = "redundantUUID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub redundant_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redundancy_type: Option<String>,
    #[serde(rename = "actionDetails", default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ConnectionAction>,
}

impl L2Connection {
    /// Redundant connection UUID, if the API reported a non-empty one
    pub fn redundant_uuid(&self) -> Option<&str> {
        self.redundant_uuid.as_deref().filter(|s| !s.is_empty())
    }

    /// Value of `key` in the required data of the action `operation_id`
    pub fn action_data(&self, operation_id: &str, key: &str) -> Option<&str> {
        self.actions
            .iter()
            .filter(|a| a.operation_id.as_deref() == Some(operation_id))
            .flat_map(|a| a.required_data.iter())
            .filter(|d| d.key.as_deref() == Some(key))
            .filter_map(|d| d.value.as_deref())
            .next_back()
    }
}

/// In-place modification of a connection.
///
/// Only these fields can change after creation; the type makes it
/// impossible to send anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub name: Option<String>,
    pub speed: Option<i64>,
    pub speed_unit: Option<String>,
}

impl ConnectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.speed.is_none() && self.speed_unit.is_none()
    }
}

/// Provider-side confirmation of a pending connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfirmation {
    pub access_key: String,
    pub secret_key: String,
}
