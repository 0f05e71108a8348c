//! Runner configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via SUBSTATE_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine definition selection.
    pub machine: MachineSettings,
    /// Event script selection.
    pub script: ScriptSettings,
    /// Report output.
    pub output: OutputSettings,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("SUBSTATE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigFileError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigFileError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.machine.apply_env_overrides();
        self.script.apply_env_overrides();
        self.output.apply_env_overrides();
    }

    /// Validates settings that cannot be checked by deserialization alone.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if self.machine.definition.trim().is_empty() {
            return Err(ConfigFileError::ValidationError(
                "machine.definition must not be empty".to_string(),
            ));
        }
        if self.script.path.is_none() && !self.script.builtin {
            return Err(ConfigFileError::ValidationError(
                "no event script: set script.path or enable script.builtin".to_string(),
            ));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigFileError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigFileError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigFileError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Machine definition selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// `builtin:<name>` or a path to a JSON/YAML definition.
    pub definition: String,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            definition: "builtin:subscription".to_string(),
        }
    }
}

impl MachineSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(definition) = std::env::var("SUBSTATE_MACHINE") {
            if !definition.is_empty() {
                self.definition = definition;
            }
        }
    }
}

/// Event script selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Path to a YAML/JSON event script.
    pub path: Option<PathBuf>,
    /// Use the built-in reference script when no path is set.
    pub builtin: bool,
    /// Abort the run on the first interpreter error.
    pub stop_on_error: bool,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            path: None,
            builtin: true,
            stop_on_error: true,
        }
    }
}

impl ScriptSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SUBSTATE_SCRIPT") {
            self.path = Some(PathBuf::from(path));
        }

        if let Ok(stop) = std::env::var("SUBSTATE_STOP_ON_ERROR") {
            self.stop_on_error = stop == "1" || stop.to_lowercase() == "true";
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One line per event, then the resulting state value.
    #[default]
    Text,
    /// A single JSON report.
    Json,
}

/// Report output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    /// Include the context in text output.
    pub show_context: bool,
}

impl OutputSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(format) = std::env::var("SUBSTATE_OUTPUT") {
            match format.to_lowercase().as_str() {
                "json" => self.format = OutputFormat::Json,
                "text" => self.format = OutputFormat::Text,
                other => tracing::warn!("Ignoring unknown SUBSTATE_OUTPUT '{}'", other),
            }
        }

        if let Ok(show) = std::env::var("SUBSTATE_SHOW_CONTEXT") {
            self.show_context = show == "1" || show.to_lowercase() == "true";
        }
    }
}

/// Configuration file error.
#[derive(Debug)]
pub enum ConfigFileError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFileError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigFileError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigFileError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigFileError {}
