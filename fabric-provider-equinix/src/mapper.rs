//! Field Mapper - Translate between resource attributes and the API model
//!
//! Attribute names form a closed set ([`Field`], [`AccepterField`]). Values
//! leave the untyped attribute map here and nowhere else: `expand_*`
//! functions build API request objects from a configuration, `flatten_*`
//! functions turn API responses back into attributes.

use std::collections::HashMap;

use fabric_core::differ::{changed_attributes, changed_block_attributes};
use fabric_core::provider::{ProviderError, ProviderResult};
use fabric_core::resource::Value;

use crate::model::{AdditionalInfo, ConnectionUpdate, L2Connection};

/// Attribute of `ecx_l2_connection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Uuid,
    Name,
    ProfileUuid,
    Speed,
    SpeedUnit,
    Status,
    ProviderStatus,
    Notifications,
    PurchaseOrderNumber,
    PortUuid,
    DeviceUuid,
    DeviceInterfaceId,
    VlanSTag,
    VlanCTag,
    NamedTag,
    AdditionalInfo,
    ZSidePortUuid,
    ZSideVlanSTag,
    ZSideVlanCTag,
    SellerRegion,
    SellerMetroCode,
    AuthorizationKey,
    RedundantUuid,
    RedundancyType,
    SecondaryConnection,
}

impl Field {
    pub const ALL: [Field; 25] = [
        Field::Uuid,
        Field::Name,
        Field::ProfileUuid,
        Field::Speed,
        Field::SpeedUnit,
        Field::Status,
        Field::ProviderStatus,
        Field::Notifications,
        Field::PurchaseOrderNumber,
        Field::PortUuid,
        Field::DeviceUuid,
        Field::DeviceInterfaceId,
        Field::VlanSTag,
        Field::VlanCTag,
        Field::NamedTag,
        Field::AdditionalInfo,
        Field::ZSidePortUuid,
        Field::ZSideVlanSTag,
        Field::ZSideVlanCTag,
        Field::SellerRegion,
        Field::SellerMetroCode,
        Field::AuthorizationKey,
        Field::RedundantUuid,
        Field::RedundancyType,
        Field::SecondaryConnection,
    ];

    /// The only attributes the API can modify in place
    pub const UPDATABLE: [Field; 3] = [Field::Name, Field::Speed, Field::SpeedUnit];

    pub fn name(self) -> &'static str {
        match self {
            Field::Uuid => "uuid",
            Field::Name => "name",
            Field::ProfileUuid => "profile_uuid",
            Field::Speed => "speed",
            Field::SpeedUnit => "speed_unit",
            Field::Status => "status",
            Field::ProviderStatus => "provider_status",
            Field::Notifications => "notifications",
            Field::PurchaseOrderNumber => "purchase_order_number",
            Field::PortUuid => "port_uuid",
            Field::DeviceUuid => "device_uuid",
            Field::DeviceInterfaceId => "device_interface_id",
            Field::VlanSTag => "vlan_stag",
            Field::VlanCTag => "vlan_ctag",
            Field::NamedTag => "named_tag",
            Field::AdditionalInfo => "additional_info",
            Field::ZSidePortUuid => "zside_port_uuid",
            Field::ZSideVlanSTag => "zside_vlan_stag",
            Field::ZSideVlanCTag => "zside_vlan_ctag",
            Field::SellerRegion => "seller_region",
            Field::SellerMetroCode => "seller_metro_code",
            Field::AuthorizationKey => "authorization_key",
            Field::RedundantUuid => "redundant_uuid",
            Field::RedundancyType => "redundancy_type",
            Field::SecondaryConnection => "secondary_connection",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Field::Uuid => "Unique identifier of the connection",
            Field::Name => {
                "Connection name, up to 24 alphanumeric characters, hyphens and underscores"
            }
            Field::ProfileUuid => "Unique identifier of the seller's service profile",
            Field::Speed => "Bandwidth allocated to the connection",
            Field::SpeedUnit => "Unit of the allocated bandwidth, MB or GB",
            Field::Status => "Provisioning status on the Equinix Fabric side",
            Field::ProviderStatus => "Provisioning status on the service provider side",
            Field::Notifications => "E-mail addresses notified about connection updates",
            Field::PurchaseOrderNumber => "Purchase order number shown on the invoice",
            Field::PortUuid => "Buyer port the connection originates from",
            Field::DeviceUuid => "Network Edge virtual device the connection originates from",
            Field::DeviceInterfaceId => {
                "Device network interface used by the connection; first free one when unset"
            }
            Field::VlanSTag => "S-Tag (outer tag) of the connection, 2 to 4092",
            Field::VlanCTag => "C-Tag (inner tag) of the connection, 2 to 4092",
            Field::NamedTag => "Azure Express Route peering type: Private, Public, Microsoft or Manual",
            Field::AdditionalInfo => "Additional name/value information objects",
            Field::ZSidePortUuid => "Port on the remote (z-side) end",
            Field::ZSideVlanSTag => "S-Tag (outer tag) on the remote (z-side) end",
            Field::ZSideVlanCTag => "C-Tag (inner tag) on the remote (z-side) end",
            Field::SellerRegion => "Region of the seller port",
            Field::SellerMetroCode => "Metro code of the remote (z-side) end",
            Field::AuthorizationKey => {
                "Key authorizing the connection on the provider side; format depends on the service profile"
            }
            Field::RedundantUuid => "Identifier of the redundant connection of an HA pair",
            Field::RedundancyType => "Role within an HA pair, primary or secondary",
            Field::SecondaryConnection => "Secondary connection of a redundant HA pair",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute of `ecx_l2_connection_accepter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccepterField {
    ConnectionId,
    AccessKey,
    SecretKey,
    Profile,
    AwsConnectionId,
}

impl AccepterField {
    pub const ALL: [AccepterField; 5] = [
        AccepterField::ConnectionId,
        AccepterField::AccessKey,
        AccepterField::SecretKey,
        AccepterField::Profile,
        AccepterField::AwsConnectionId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AccepterField::ConnectionId => "connection_id",
            AccepterField::AccessKey => "access_key",
            AccepterField::SecretKey => "secret_key",
            AccepterField::Profile => "aws_profile",
            AccepterField::AwsConnectionId => "aws_connection_id",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AccepterField::ConnectionId => "Layer 2 connection to accept",
            AccepterField::AccessKey => "AWS access key used to accept the connection",
            AccepterField::SecretKey => "AWS secret key used to accept the connection",
            AccepterField::Profile => "Profile of the AWS shared credentials file",
            AccepterField::AwsConnectionId => {
                "Hosted Direct Connect connection on the AWS side (AWS connections only)"
            }
        }
    }
}

impl std::fmt::Display for AccepterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Attribute access
// =============================================================================

/// Attribute value; a zero value counts as unset
fn get_set(attrs: &HashMap<String, Value>, field: Field) -> Option<&Value> {
    attrs.get(field.name()).filter(|v| !v.is_zero())
}

fn get_str(attrs: &HashMap<String, Value>, field: Field) -> Option<String> {
    get_set(attrs, field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn get_int(attrs: &HashMap<String, Value>, field: Field) -> Option<i64> {
    get_set(attrs, field).and_then(Value::as_int)
}

fn set_str(attrs: &mut HashMap<String, Value>, field: Field, value: &Option<String>) {
    if let Some(v) = value {
        attrs.insert(field.name().to_string(), Value::String(v.clone()));
    }
}

fn set_int(attrs: &mut HashMap<String, Value>, field: Field, value: Option<i64>) {
    if let Some(v) = value {
        attrs.insert(field.name().to_string(), Value::Int(v));
    }
}

/// Element 0 of the `secondary_connection` block, if configured
pub fn secondary_block(attrs: &HashMap<String, Value>) -> Option<&HashMap<String, Value>> {
    fabric_core::differ::block_element(attrs, Field::SecondaryConnection.name(), 0)
}

fn conflict(a: Field, b: Field, scope: &str) -> ProviderError {
    ProviderError::validation(format!("{scope}{a} conflicts with {scope}{b}"))
}

fn requires(a: Field, b: Field, scope: &str) -> ProviderError {
    ProviderError::validation(format!("{scope}{a} requires {scope}{b}"))
}

/// Origin rules shared by both sides: exactly one of port/device, device
/// interface only with a device, VLAN tags only with a port.
fn check_origin(conn: &L2Connection, scope: &str) -> ProviderResult<()> {
    match (&conn.port_uuid, &conn.device_uuid) {
        (Some(_), Some(_)) => return Err(conflict(Field::PortUuid, Field::DeviceUuid, scope)),
        (None, None) => {
            return Err(ProviderError::validation(format!(
                "one of {scope}{} or {scope}{} must be set",
                Field::PortUuid,
                Field::DeviceUuid
            )));
        }
        _ => {}
    }
    if conn.device_interface_id.is_some() && conn.port_uuid.is_some() {
        return Err(conflict(Field::DeviceInterfaceId, Field::PortUuid, scope));
    }
    if conn.vlan_stag.is_some() && conn.port_uuid.is_none() {
        return Err(requires(Field::VlanSTag, Field::PortUuid, scope));
    }
    if conn.vlan_ctag.is_some() && conn.device_uuid.is_some() {
        return Err(conflict(Field::VlanCTag, Field::DeviceUuid, scope));
    }
    Ok(())
}

// =============================================================================
// Expand
// =============================================================================

/// Build the primary and optional secondary connection from a configuration.
///
/// Fails with a validation error, before anything is sent, when the
/// configuration breaks a cross-field rule.
pub fn expand_connection(
    attrs: &HashMap<String, Value>,
) -> ProviderResult<(L2Connection, Option<L2Connection>)> {
    let mut primary = L2Connection {
        name: get_str(attrs, Field::Name),
        profile_uuid: get_str(attrs, Field::ProfileUuid),
        speed: get_int(attrs, Field::Speed),
        speed_unit: get_str(attrs, Field::SpeedUnit),
        purchase_order_number: get_str(attrs, Field::PurchaseOrderNumber),
        port_uuid: get_str(attrs, Field::PortUuid),
        device_uuid: get_str(attrs, Field::DeviceUuid),
        device_interface_id: get_int(attrs, Field::DeviceInterfaceId),
        vlan_stag: get_int(attrs, Field::VlanSTag),
        vlan_ctag: get_int(attrs, Field::VlanCTag),
        named_tag: get_str(attrs, Field::NamedTag),
        zside_port_uuid: get_str(attrs, Field::ZSidePortUuid),
        zside_vlan_stag: get_int(attrs, Field::ZSideVlanSTag),
        zside_vlan_ctag: get_int(attrs, Field::ZSideVlanCTag),
        seller_region: get_str(attrs, Field::SellerRegion),
        seller_metro_code: get_str(attrs, Field::SellerMetroCode),
        authorization_key: get_str(attrs, Field::AuthorizationKey),
        ..Default::default()
    };

    if let Some(items) = attrs.get(Field::Notifications.name()).and_then(Value::as_list) {
        primary.notifications = items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(items) = attrs.get(Field::AdditionalInfo.name()).and_then(Value::as_list) {
        primary.additional_info = expand_additional_info(items);
    }

    check_origin(&primary, "")?;
    if primary.profile_uuid.is_none() && primary.zside_port_uuid.is_none() {
        return Err(ProviderError::validation(format!(
            "one of {} or {} must be set",
            Field::ProfileUuid,
            Field::ZSidePortUuid
        )));
    }

    let secondary = match secondary_block(attrs) {
        Some(block) => Some(expand_secondary(block)?),
        None => None,
    };

    Ok((primary, secondary))
}

/// Build the secondary connection from element 0 of `secondary_connection`.
///
/// Empty values are omitted so the API can default them from the primary.
pub fn expand_secondary(block: &HashMap<String, Value>) -> ProviderResult<L2Connection> {
    let conn = L2Connection {
        name: get_str(block, Field::Name),
        profile_uuid: get_str(block, Field::ProfileUuid),
        speed: get_int(block, Field::Speed),
        speed_unit: get_str(block, Field::SpeedUnit),
        port_uuid: get_str(block, Field::PortUuid),
        device_uuid: get_str(block, Field::DeviceUuid),
        device_interface_id: get_int(block, Field::DeviceInterfaceId),
        vlan_stag: get_int(block, Field::VlanSTag),
        vlan_ctag: get_int(block, Field::VlanCTag),
        seller_region: get_str(block, Field::SellerRegion),
        seller_metro_code: get_str(block, Field::SellerMetroCode),
        authorization_key: get_str(block, Field::AuthorizationKey),
        ..Default::default()
    };

    let scope = format!("{}.0.", Field::SecondaryConnection);
    check_origin(&conn, &scope)?;
    if conn.speed_unit.is_some() && conn.speed.is_none() {
        return Err(requires(Field::SpeedUnit, Field::Speed, &scope));
    }
    Ok(conn)
}

/// Additional info as a set: duplicates dropped, order irrelevant
pub fn expand_additional_info(items: &[Value]) -> Vec<AdditionalInfo> {
    let mut infos: Vec<AdditionalInfo> = items
        .iter()
        .filter_map(Value::as_map)
        .filter_map(|item| {
            let name = item.get("name").and_then(Value::as_str)?;
            let value = item.get("value").and_then(Value::as_str)?;
            Some(AdditionalInfo {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect();
    infos.sort();
    infos.dedup();
    infos
}

// =============================================================================
// Flatten
// =============================================================================

/// Turn an API response into resource attributes.
///
/// `previous` is the prior attribute map; it supplies the secondary's device
/// interface id when the API reports none for it.
pub fn flatten_connection(
    primary: &L2Connection,
    secondary: Option<&L2Connection>,
    previous: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut attrs = HashMap::new();
    set_str(&mut attrs, Field::Uuid, &primary.uuid);
    set_str(&mut attrs, Field::Name, &primary.name);
    set_str(&mut attrs, Field::ProfileUuid, &primary.profile_uuid);
    set_int(&mut attrs, Field::Speed, primary.speed);
    set_str(&mut attrs, Field::SpeedUnit, &primary.speed_unit);
    set_str(
        &mut attrs,
        Field::Status,
        &primary.status.as_ref().map(ToString::to_string),
    );
    set_str(
        &mut attrs,
        Field::ProviderStatus,
        &primary.provider_status.as_ref().map(ToString::to_string),
    );
    if !primary.notifications.is_empty() {
        let mut notifications = primary.notifications.clone();
        notifications.sort();
        attrs.insert(
            Field::Notifications.name().to_string(),
            Value::List(notifications.into_iter().map(Value::String).collect()),
        );
    }
    set_str(&mut attrs, Field::PurchaseOrderNumber, &primary.purchase_order_number);
    set_str(&mut attrs, Field::PortUuid, &primary.port_uuid);
    set_str(&mut attrs, Field::DeviceUuid, &primary.device_uuid);
    set_int(&mut attrs, Field::DeviceInterfaceId, primary.device_interface_id);
    set_int(&mut attrs, Field::VlanSTag, primary.vlan_stag);
    set_int(&mut attrs, Field::VlanCTag, primary.vlan_ctag);
    set_str(&mut attrs, Field::NamedTag, &primary.named_tag);
    if !primary.additional_info.is_empty() {
        attrs.insert(
            Field::AdditionalInfo.name().to_string(),
            flatten_additional_info(&primary.additional_info),
        );
    }
    set_str(&mut attrs, Field::ZSidePortUuid, &primary.zside_port_uuid);
    set_int(&mut attrs, Field::ZSideVlanSTag, primary.zside_vlan_stag);
    set_int(&mut attrs, Field::ZSideVlanCTag, primary.zside_vlan_ctag);
    set_str(&mut attrs, Field::SellerRegion, &primary.seller_region);
    set_str(&mut attrs, Field::SellerMetroCode, &primary.seller_metro_code);
    set_str(&mut attrs, Field::AuthorizationKey, &primary.authorization_key);
    set_str(&mut attrs, Field::RedundantUuid, &primary.redundant_uuid);
    set_str(&mut attrs, Field::RedundancyType, &primary.redundancy_type);

    if let Some(secondary) = secondary {
        attrs.insert(
            Field::SecondaryConnection.name().to_string(),
            Value::List(vec![flatten_secondary(secondary_block(previous), secondary)]),
        );
    }
    attrs
}

/// Turn the secondary connection into element 0 of `secondary_connection`
pub fn flatten_secondary(previous: Option<&HashMap<String, Value>>, conn: &L2Connection) -> Value {
    let mut attrs = HashMap::new();
    set_str(&mut attrs, Field::Uuid, &conn.uuid);
    set_str(&mut attrs, Field::Name, &conn.name);
    set_str(&mut attrs, Field::ProfileUuid, &conn.profile_uuid);
    set_int(&mut attrs, Field::Speed, conn.speed);
    set_str(&mut attrs, Field::SpeedUnit, &conn.speed_unit);
    set_str(
        &mut attrs,
        Field::Status,
        &conn.status.as_ref().map(ToString::to_string),
    );
    set_str(
        &mut attrs,
        Field::ProviderStatus,
        &conn.provider_status.as_ref().map(ToString::to_string),
    );
    set_str(&mut attrs, Field::PortUuid, &conn.port_uuid);
    set_str(&mut attrs, Field::DeviceUuid, &conn.device_uuid);
    set_int(
        &mut attrs,
        Field::DeviceInterfaceId,
        interface_id_or_previous(conn.device_interface_id, previous),
    );
    set_int(&mut attrs, Field::VlanSTag, conn.vlan_stag);
    set_int(&mut attrs, Field::VlanCTag, conn.vlan_ctag);
    set_str(&mut attrs, Field::ZSidePortUuid, &conn.zside_port_uuid);
    set_int(&mut attrs, Field::ZSideVlanSTag, conn.zside_vlan_stag);
    set_int(&mut attrs, Field::ZSideVlanCTag, conn.zside_vlan_ctag);
    set_str(&mut attrs, Field::SellerRegion, &conn.seller_region);
    set_str(&mut attrs, Field::SellerMetroCode, &conn.seller_metro_code);
    set_str(&mut attrs, Field::AuthorizationKey, &conn.authorization_key);
    set_str(&mut attrs, Field::RedundantUuid, &conn.redundant_uuid);
    set_str(&mut attrs, Field::RedundancyType, &conn.redundancy_type);
    Value::Map(attrs)
}

fn interface_id_or_previous(
    reported: Option<i64>,
    previous: Option<&HashMap<String, Value>>,
) -> Option<i64> {
    reported
        .filter(|id| *id != 0)
        .or_else(|| previous.and_then(|p| get_int(p, Field::DeviceInterfaceId)))
}

pub fn flatten_additional_info(infos: &[AdditionalInfo]) -> Value {
    let mut sorted = infos.to_vec();
    sorted.sort();
    sorted.dedup();
    Value::List(
        sorted
            .into_iter()
            .map(|info| {
                Value::Map(HashMap::from([
                    ("name".to_string(), Value::String(info.name)),
                    ("value".to_string(), Value::String(info.value)),
                ]))
            })
            .collect(),
    )
}

// =============================================================================
// Update
// =============================================================================

fn to_update(changes: Vec<(&str, Option<Value>)>) -> ConnectionUpdate {
    let mut update = ConnectionUpdate::default();
    for (key, value) in changes {
        // A removed value cannot be sent; the API keeps its current one.
        let Some(value) = value else { continue };
        match key {
            "name" => update.name = value.as_str().map(str::to_string),
            "speed" => update.speed = value.as_int(),
            "speed_unit" => update.speed_unit = value.as_str().map(str::to_string),
            _ => {}
        }
    }
    update
}

fn updatable_names() -> [&'static str; 3] {
    Field::UPDATABLE.map(Field::name)
}

/// Changes of the primary connection that can be applied in place
pub fn updatable_changes(
    current: &HashMap<String, Value>,
    desired: &HashMap<String, Value>,
) -> ConnectionUpdate {
    to_update(changed_attributes(&updatable_names(), current, desired))
}

/// Changes of `secondary_connection.0` that can be applied in place
pub fn secondary_updatable_changes(
    current: &HashMap<String, Value>,
    desired: &HashMap<String, Value>,
) -> ConnectionUpdate {
    to_update(changed_block_attributes(
        &updatable_names(),
        Field::SecondaryConnection.name(),
        0,
        current,
        desired,
    ))
}
