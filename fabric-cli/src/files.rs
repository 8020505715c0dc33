//! JSON resource and state files read and written by the CLI

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use fabric_core::resource::{Resource, ResourceId, State, Value};

/// Desired configuration of one resource
#[derive(Debug, Deserialize)]
pub struct ResourceFile {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Recorded state of one resource
#[derive(Debug, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default = "default_exists")]
    pub exists: bool,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

fn default_exists() -> bool {
    true
}

fn attributes_from_json(
    attributes: &serde_json::Map<String, serde_json::Value>,
) -> HashMap<String, Value> {
    attributes
        .iter()
        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

pub fn load_resource(path: &Path) -> Result<Resource, String> {
    let file: ResourceFile = read_json(path)?;
    Ok(Resource {
        id: ResourceId::new(file.resource_type, file.name),
        attributes: attributes_from_json(&file.attributes),
    })
}

pub fn load_state(path: &Path) -> Result<State, String> {
    let file: StateFile = read_json(path)?;
    let id = ResourceId::new(file.resource_type, file.name);
    if !file.exists {
        return Ok(State::not_found(id));
    }
    let state = State::existing(id, attributes_from_json(&file.attributes));
    Ok(match file.identifier {
        Some(identifier) => state.with_identifier(identifier),
        None => state,
    })
}

impl From<&State> for StateFile {
    fn from(state: &State) -> Self {
        let mut keys: Vec<&String> = state.attributes.keys().collect();
        keys.sort();
        StateFile {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            exists: state.exists,
            attributes: keys
                .into_iter()
                .map(|k| (k.clone(), state.attributes[k].to_json()))
                .collect(),
        }
    }
}

pub fn state_to_json(state: &State) -> Result<String, String> {
    serde_json::to_string_pretty(&StateFile::from(state))
        .map_err(|e| format!("Failed to encode state: {}", e))
}
