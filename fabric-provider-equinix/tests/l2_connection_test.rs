// Lifecycle tests for `ecx_l2_connection` against an in-memory API.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use fabric_core::provider::{ErrorKind, OperationContext, Provider, Timeouts};
use fabric_core::resource::{Resource, ResourceId, State, Value};
use fabric_provider_equinix::EquinixProvider;
use fabric_provider_equinix::model::{ConnectionStatus, ConnectionUpdate, L2Connection};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use common::{Call, FakeApi};

// ── Helpers ─────────────────────────────────────────────────────────

fn provider(api: &FakeApi) -> EquinixProvider {
    EquinixProvider::new(api.as_api())
}

fn connection_resource() -> Resource {
    Resource::new("ecx_l2_connection", "main")
        .with_attribute("name", "tf-primary")
        .with_attribute("profile_uuid", "profile-1")
        .with_attribute("speed", 50)
        .with_attribute("speed_unit", "MB")
        .with_attribute(
            "notifications",
            Value::List(vec![Value::from("ops@example.com")]),
        )
        .with_attribute("port_uuid", "port-1")
        .with_attribute("vlan_stag", 100)
}

fn with_secondary(resource: Resource, name: &str) -> Resource {
    let block = HashMap::from([
        ("name".to_string(), Value::from(name)),
        ("port_uuid".to_string(), Value::from("port-2")),
        ("vlan_stag".to_string(), Value::Int(200)),
    ]);
    resource.with_attribute("secondary_connection", Value::List(vec![Value::Map(block)]))
}

fn secondary_attr<'a>(state: &'a State, key: &str) -> Option<&'a Value> {
    state
        .attributes
        .get("secondary_connection")
        .and_then(Value::as_list)
        .and_then(|items| items.first())
        .and_then(Value::as_map)
        .and_then(|block| block.get(key))
}

fn existing(uuid: &str, status: ConnectionStatus) -> L2Connection {
    L2Connection {
        uuid: Some(uuid.to_string()),
        name: Some("tf-primary".to_string()),
        profile_uuid: Some("profile-1".to_string()),
        speed: Some(50),
        speed_unit: Some("MB".to_string()),
        status: Some(status),
        notifications: vec!["ops@example.com".to_string()],
        port_uuid: Some("port-1".to_string()),
        vlan_stag: Some(100),
        ..Default::default()
    }
}

fn redundant_pair(api: &FakeApi) {
    let mut primary = existing("p-1", ConnectionStatus::Provisioned);
    primary.redundant_uuid = Some("s-1".to_string());
    primary.redundancy_type = Some("primary".to_string());
    let mut secondary = existing("s-1", ConnectionStatus::Provisioned);
    secondary.name = Some("tf-secondary".to_string());
    secondary.port_uuid = Some("port-2".to_string());
    secondary.vlan_stag = Some(200);
    secondary.redundant_uuid = Some("p-1".to_string());
    secondary.redundancy_type = Some("secondary".to_string());
    api.insert(primary);
    api.insert(secondary);
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn redundant_create_yields_both_connections() {
    let api = FakeApi::new();
    api.on_create_report(vec![
        ConnectionStatus::Provisioning,
        ConnectionStatus::Provisioning,
        ConnectionStatus::Provisioned,
    ]);
    let resource = with_secondary(connection_resource(), "tf-secondary");

    let started = Instant::now();
    let state = provider(&api)
        .create(&OperationContext::new(), &resource)
        .await
        .unwrap();

    assert!(state.exists);
    let primary_id = state.identifier.clone().unwrap();
    let secondary_id = state.get_string("redundant_uuid").unwrap().to_string();
    assert_ne!(primary_id, secondary_id);
    assert_eq!(state.get_string("uuid"), Some(primary_id.as_str()));
    assert_eq!(state.get_string("redundancy_type"), Some("primary"));
    assert_eq!(state.attributes.get("speed"), Some(&Value::Int(50)));
    assert_eq!(state.get_string("speed_unit"), Some("MB"));
    assert_eq!(state.get_string("status"), Some("PROVISIONED"));

    assert_eq!(
        secondary_attr(&state, "uuid"),
        Some(&Value::String(secondary_id.clone()))
    );
    assert_eq!(
        secondary_attr(&state, "redundancy_type"),
        Some(&Value::from("secondary"))
    );
    assert_eq!(secondary_attr(&state, "speed"), Some(&Value::Int(50)));
    assert_eq!(secondary_attr(&state, "speed_unit"), Some(&Value::from("MB")));

    assert_eq!(api.calls()[0], Call::CreateRedundant);
    // Three polls plus the final read
    assert_eq!(api.gets_of(&primary_id), 4);
    assert!(started.elapsed() >= Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn single_create_accepts_pending_approval() {
    let api = FakeApi::new();
    api.on_create_report(vec![
        ConnectionStatus::PendingAutoApproval,
        ConnectionStatus::PendingApproval,
    ]);

    let state = provider(&api)
        .create(&OperationContext::new(), &connection_resource())
        .await
        .unwrap();

    assert_eq!(api.calls()[0], Call::Create);
    assert_eq!(state.get_string("status"), Some("PENDING_APPROVAL"));
    assert!(!state.attributes.contains_key("secondary_connection"));
    assert_eq!(state.get_string("redundant_uuid"), None);
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_never_reaches_api() {
    let api = FakeApi::new();
    let resource = connection_resource().with_attribute("device_uuid", "dev-1");

    let err = provider(&api)
        .create(&OperationContext::new(), &resource)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(
        err.resource_id,
        Some(ResourceId::new("ecx_l2_connection", "main"))
    );
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn schema_violation_never_reaches_api() {
    let api = FakeApi::new();
    let resource = connection_resource().with_attribute("vlan_stag", 4093);

    let err = provider(&api)
        .create(&OperationContext::new(), &resource)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_times_out_at_configured_deadline() {
    let api = FakeApi::new();
    api.on_create_report(vec![ConnectionStatus::Provisioning]);
    let ctx = OperationContext::new().with_timeouts(Timeouts {
        create: Some(Duration::from_secs(30)),
        ..Default::default()
    });

    let started = Instant::now();
    let err = provider(&api)
        .create(&ctx, &connection_resource())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(err.to_string().contains("to be created"));
}

#[tokio::test(start_paused = true)]
async fn create_fails_on_unexpected_status() {
    let api = FakeApi::new();
    api.on_create_report(vec![ConnectionStatus::Deprovisioned]);

    let err = provider(&api)
        .create(&OperationContext::new(), &connection_resource())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnexpectedState);
}

#[tokio::test(start_paused = true)]
async fn create_can_be_cancelled() {
    let api = FakeApi::new();
    api.on_create_report(vec![ConnectionStatus::Provisioning]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let ctx = OperationContext::new().with_cancellation(cancel);
    let started = Instant::now();
    let err = provider(&api)
        .create(&ctx, &connection_resource())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(60));
}

// ── Read / Import ───────────────────────────────────────────────────

#[tokio::test]
async fn read_of_deleted_connection_clears_identity() {
    let api = FakeApi::new();
    api.insert(existing("p-1", ConnectionStatus::Deleted));
    let prior = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let state = provider(&api)
        .read(&OperationContext::new(), &prior)
        .await
        .unwrap();

    assert!(!state.exists);
    assert_eq!(state.identifier, None);
}

#[tokio::test]
async fn read_fetches_secondary() {
    let api = FakeApi::new();
    redundant_pair(&api);
    let prior = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let state = provider(&api)
        .read(&OperationContext::new(), &prior)
        .await
        .unwrap();

    assert_eq!(state.get_string("redundant_uuid"), Some("s-1"));
    assert_eq!(secondary_attr(&state, "name"), Some(&Value::from("tf-secondary")));
    assert_eq!(api.gets_of("s-1"), 1);
}

#[tokio::test]
async fn import_is_a_passthrough_read() {
    let api = FakeApi::new();
    api.insert(existing("p-1", ConnectionStatus::Provisioned));

    let state = provider(&api)
        .import(
            &OperationContext::new(),
            &ResourceId::new("ecx_l2_connection", "imported"),
            "p-1",
        )
        .await
        .unwrap();

    assert!(state.exists);
    assert_eq!(state.identifier.as_deref(), Some("p-1"));
    assert_eq!(state.get_string("name"), Some("tf-primary"));
}

#[tokio::test]
async fn unknown_resource_type_is_rejected() {
    let api = FakeApi::new();
    let prior = State::existing(ResourceId::new("ecx_l3_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let err = provider(&api)
        .read(&OperationContext::new(), &prior)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(api.calls().is_empty());
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn update_sends_only_name_speed_and_unit() {
    let api = FakeApi::new();
    redundant_pair(&api);
    let provider = provider(&api);
    let ctx = OperationContext::new();
    let prior = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");
    let current = provider.read(&ctx, &prior).await.unwrap();

    let desired = with_secondary(
        connection_resource()
            .with_attribute("name", "renamed")
            .with_attribute("speed", 100)
            .with_attribute("purchase_order_number", "PO-1"),
        "tf-secondary-2",
    );
    let state = provider.update(&ctx, &current, &desired).await.unwrap();

    assert_eq!(
        api.updates(),
        vec![
            (
                "p-1".to_string(),
                ConnectionUpdate {
                    name: Some("renamed".to_string()),
                    speed: Some(100),
                    speed_unit: None,
                }
            ),
            (
                "s-1".to_string(),
                ConnectionUpdate {
                    name: Some("tf-secondary-2".to_string()),
                    speed: None,
                    speed_unit: None,
                }
            ),
        ]
    );
    assert_eq!(state.get_string("name"), Some("renamed"));
    assert_eq!(state.attributes.get("speed"), Some(&Value::Int(100)));
    assert_eq!(state.get_string("purchase_order_number"), None);
}

#[tokio::test]
async fn update_without_changes_sends_nothing() {
    let api = FakeApi::new();
    api.insert(existing("p-1", ConnectionStatus::Provisioned));
    let provider = provider(&api);
    let ctx = OperationContext::new();
    let prior = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");
    let current = provider.read(&ctx, &prior).await.unwrap();

    provider
        .update(&ctx, &current, &connection_resource())
        .await
        .unwrap();

    assert!(api.updates().is_empty());
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn delete_of_already_deleted_connection_succeeds() {
    let api = FakeApi::new();
    api.fail_delete("p-1", "IC-LAYER2-4021");
    let state = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let diagnostics = provider(&api)
        .delete(&OperationContext::new(), &state)
        .await
        .unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(api.calls(), vec![Call::Delete("p-1".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn delete_fails_on_other_application_error() {
    let api = FakeApi::new();
    api.fail_delete("p-1", "IC-LAYER2-4999");
    let state = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let err = provider(&api)
        .delete(&OperationContext::new(), &state)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Application);
}

#[tokio::test(start_paused = true)]
async fn secondary_delete_failure_is_a_warning() {
    let api = FakeApi::new();
    redundant_pair(&api);
    api.fail_delete("s-1", "IC-LAYER2-4999");
    api.script_status(
        "p-1",
        vec![
            ConnectionStatus::Deprovisioning,
            ConnectionStatus::Deprovisioned,
        ],
    );
    let attributes = HashMap::from([("redundant_uuid".to_string(), Value::from("s-1"))]);
    let state = State::existing(ResourceId::new("ecx_l2_connection", "main"), attributes)
        .with_identifier("p-1");

    let diagnostics = provider(&api)
        .delete(&OperationContext::new(), &state)
        .await
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_warning());
    assert_eq!(diagnostics[0].attribute.as_deref(), Some("redundant_uuid"));
    assert!(diagnostics[0].summary.contains("s-1"));
    assert_eq!(api.gets_of("p-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn delete_waits_for_deprovisioning() {
    let api = FakeApi::new();
    api.insert(existing("p-1", ConnectionStatus::Provisioned));
    api.script_status(
        "p-1",
        vec![
            ConnectionStatus::Deprovisioning,
            ConnectionStatus::Deprovisioning,
            ConnectionStatus::PendingDelete,
        ],
    );
    let state = State::existing(ResourceId::new("ecx_l2_connection", "main"), HashMap::new())
        .with_identifier("p-1");

    let started = Instant::now();
    let diagnostics = provider(&api)
        .delete(&OperationContext::new(), &state)
        .await
        .unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(api.gets_of("p-1"), 3);
    assert!(started.elapsed() >= Duration::from_secs(6));
}
