//! Event scripts and definition files.
//!
//! Scripts are YAML (or JSON) documents:
//!
//! ```yaml
//! start_at: free            # optional, defaults to the machine's initial state
//! context: {plan: pro}      # optional, defaults to the machine's context
//! events:
//!   - START
//!   - {type: CANCEL, payload: {reason: price}}
//! ```

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use substate_core::{Event, MachineConfig, MachineDefinition};

/// A scripted sequence of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventScript {
    /// State to start in (root-relative or fully-qualified path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,

    /// Context to start with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Events to send, in order.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl EventScript {
    pub fn new(events: impl IntoIterator<Item = impl Into<Event>>) -> Self {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, HarnessError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a script file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        if is_json(path) {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }
}

/// Loads a machine definition file; `.yaml`/`.yml` files are parsed as YAML,
/// anything else as JSON.
pub fn load_definition(path: impl AsRef<Path>) -> Result<MachineDefinition, HarnessError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;

    let definition = if is_yaml(path) {
        let raw: MachineConfig = serde_yaml::from_str(&content)?;
        MachineDefinition::from_config(raw)?
    } else {
        MachineDefinition::from_json_str(&content)?
    };

    tracing::debug!(
        "Loaded machine '{}' from {} ({} states)",
        definition.id(),
        path.display(),
        definition.len()
    );
    Ok(definition)
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}
