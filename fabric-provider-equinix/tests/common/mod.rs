// In-memory FabricApi used by the lifecycle tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fabric_provider_equinix::client::{ApiResult, FabricApi};
use fabric_provider_equinix::error::{ApiError, ApplicationError};
use fabric_provider_equinix::model::{
    ConnectionConfirmation, ConnectionStatus, ConnectionUpdate, L2Connection,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create,
    CreateRedundant,
    Get(String),
    Delete(String),
    Update(String, ConnectionUpdate),
    Confirm(String, ConnectionConfirmation),
}

#[derive(Default)]
struct Inner {
    connections: HashMap<String, L2Connection>,
    status_scripts: HashMap<String, VecDeque<ConnectionStatus>>,
    provider_status_scripts: HashMap<String, VecDeque<ConnectionStatus>>,
    create_script: Vec<ConnectionStatus>,
    delete_failures: HashMap<String, String>,
    calls: Vec<Call>,
    next_id: u32,
}

#[derive(Default, Clone)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

pub fn application_error(code: &str) -> ApiError {
    ApiError::Application {
        status: 400,
        errors: vec![ApplicationError {
            code: code.to_string(),
            message: format!("error {code}"),
            property: None,
        }],
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_api(&self) -> Arc<dyn FabricApi> {
        Arc::new(self.clone())
    }

    /// Statuses reported by successive reads of each newly created primary
    pub fn on_create_report(&self, statuses: Vec<ConnectionStatus>) {
        self.inner.lock().unwrap().create_script = statuses;
    }

    /// Statuses reported by successive reads of `uuid`; the last one sticks
    pub fn script_status(&self, uuid: &str, statuses: Vec<ConnectionStatus>) {
        self.inner
            .lock()
            .unwrap()
            .status_scripts
            .insert(uuid.to_string(), statuses.into());
    }

    pub fn script_provider_status(&self, uuid: &str, statuses: Vec<ConnectionStatus>) {
        self.inner
            .lock()
            .unwrap()
            .provider_status_scripts
            .insert(uuid.to_string(), statuses.into());
    }

    pub fn fail_delete(&self, uuid: &str, code: &str) {
        self.inner
            .lock()
            .unwrap()
            .delete_failures
            .insert(uuid.to_string(), code.to_string());
    }

    pub fn insert(&self, connection: L2Connection) {
        let uuid = connection.uuid.clone().unwrap();
        self.inner
            .lock()
            .unwrap()
            .connections
            .insert(uuid, connection);
    }

    pub fn connection(&self, uuid: &str) -> Option<L2Connection> {
        self.inner.lock().unwrap().connections.get(uuid).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn gets_of(&self, uuid: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Get(id) if id == uuid))
            .count()
    }

    pub fn updates(&self) -> Vec<(String, ConnectionUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(uuid, update) => Some((uuid, update)),
                _ => None,
            })
            .collect()
    }
}

impl Inner {
    fn store(&mut self, prefix: &str, conn: &L2Connection) -> String {
        self.next_id += 1;
        let uuid = format!("{}-{}", prefix, self.next_id);
        let mut stored = conn.clone();
        stored.uuid = Some(uuid.clone());
        stored.status = Some(ConnectionStatus::Provisioning);
        self.connections.insert(uuid.clone(), stored);
        uuid
    }

    fn arm_create_script(&mut self, uuid: &str) {
        if !self.create_script.is_empty() {
            let script = self.create_script.clone();
            self.status_scripts.insert(uuid.to_string(), script.into());
        }
    }
}

fn advance(script: Option<&mut VecDeque<ConnectionStatus>>) -> Option<ConnectionStatus> {
    let script = script?;
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

#[async_trait]
impl FabricApi for FakeApi {
    async fn create_connection(&self, connection: &L2Connection) -> ApiResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Create);
        let uuid = inner.store("conn", connection);
        inner.arm_create_script(&uuid);
        Ok(uuid)
    }

    async fn create_redundant_connection(
        &self,
        primary: &L2Connection,
        secondary: &L2Connection,
    ) -> ApiResult<(String, String)> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::CreateRedundant);

        // The secondary inherits what it leaves unset from the primary.
        let mut secondary = secondary.clone();
        if secondary.speed.is_none() {
            secondary.speed = primary.speed;
            secondary.speed_unit = primary.speed_unit.clone();
        }
        if secondary.profile_uuid.is_none() {
            secondary.profile_uuid = primary.profile_uuid.clone();
        }

        let primary_id = inner.store("primary", primary);
        let secondary_id = inner.store("secondary", &secondary);
        if let Some(conn) = inner.connections.get_mut(&primary_id) {
            conn.redundant_uuid = Some(secondary_id.clone());
            conn.redundancy_type = Some("primary".to_string());
        }
        if let Some(conn) = inner.connections.get_mut(&secondary_id) {
            conn.redundant_uuid = Some(primary_id.clone());
            conn.redundancy_type = Some("secondary".to_string());
            conn.status = Some(ConnectionStatus::Provisioned);
        }
        inner.arm_create_script(&primary_id);
        Ok((primary_id, secondary_id))
    }

    async fn get_connection(&self, uuid: &str) -> ApiResult<L2Connection> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Get(uuid.to_string()));

        let status = advance(inner.status_scripts.get_mut(uuid));
        let provider_status = advance(inner.provider_status_scripts.get_mut(uuid));
        let conn = inner
            .connections
            .get_mut(uuid)
            .ok_or_else(|| application_error("IC-LAYER2-4006"))?;
        if status.is_some() {
            conn.status = status;
        }
        if provider_status.is_some() {
            conn.provider_status = provider_status;
        }
        Ok(conn.clone())
    }

    async fn delete_connection(&self, uuid: &str) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Delete(uuid.to_string()));
        if let Some(code) = inner.delete_failures.get(uuid) {
            return Err(application_error(code));
        }
        match inner.connections.get_mut(uuid) {
            Some(conn) => {
                conn.status = Some(ConnectionStatus::Deprovisioning);
                Ok(())
            }
            None => Err(application_error("IC-LAYER2-4006")),
        }
    }

    async fn update_connection(&self, uuid: &str, update: &ConnectionUpdate) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .calls
            .push(Call::Update(uuid.to_string(), update.clone()));
        let conn = inner
            .connections
            .get_mut(uuid)
            .ok_or_else(|| application_error("IC-LAYER2-4006"))?;
        if let Some(ref name) = update.name {
            conn.name = Some(name.clone());
        }
        if let Some(speed) = update.speed {
            conn.speed = Some(speed);
        }
        if let Some(ref unit) = update.speed_unit {
            conn.speed_unit = Some(unit.clone());
        }
        Ok(())
    }

    async fn confirm_connection(
        &self,
        uuid: &str,
        confirmation: &ConnectionConfirmation,
    ) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .calls
            .push(Call::Confirm(uuid.to_string(), confirmation.clone()));
        if inner.connections.contains_key(uuid) {
            Ok(())
        } else {
            Err(application_error("IC-LAYER2-4006"))
        }
    }
}
