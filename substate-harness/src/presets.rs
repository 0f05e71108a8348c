//! Built-in machines and scripts.
//!
//! Definition arguments of the form `builtin:<name>` refer to these presets.

use crate::error::HarnessError;
use crate::script::EventScript;
use substate_core::MachineDefinition;

/// Prefix selecting a built-in preset instead of a file path.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Subscription lifecycle machine.
pub const SUBSCRIPTION_JSON: &str = include_str!("../machines/subscription.json");

/// Reference event script for the subscription machine.
pub const REFERENCE_SCRIPT_YAML: &str = include_str!("../scripts/reference.yaml");

/// Names of all built-in machines.
pub const MACHINES: &[&str] = &["subscription"];

/// Parses the built-in subscription machine.
pub fn subscription() -> Result<MachineDefinition, HarnessError> {
    Ok(MachineDefinition::from_json_str(SUBSCRIPTION_JSON)?)
}

/// Parses the reference subscription event script.
pub fn reference_script() -> Result<EventScript, HarnessError> {
    EventScript::from_yaml_str(REFERENCE_SCRIPT_YAML)
}

/// Loads a built-in machine by name.
pub fn machine(name: &str) -> Result<MachineDefinition, HarnessError> {
    match name {
        "subscription" => subscription(),
        other => Err(HarnessError::UnknownPreset(other.to_string())),
    }
}

/// Loads a machine from `builtin:<name>` or a JSON/YAML file path.
pub fn load_machine(source: &str) -> Result<MachineDefinition, HarnessError> {
    match source.strip_prefix(BUILTIN_PREFIX) {
        Some(name) => machine(name),
        None => crate::script::load_definition(source),
    }
}
