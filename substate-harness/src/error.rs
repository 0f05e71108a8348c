//! Harness error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading machines and scripts or running them.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] substate_core::CoreError),

    #[error("machine definition error: {0}")]
    Config(#[from] substate_core::ConfigError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

impl HarnessError {
    /// Stable code printed by the binaries and recorded on failed steps.
    pub fn error_code(&self) -> &'static str {
        match self {
            HarnessError::Io { .. } => "IO_ERROR",
            HarnessError::Core(e) => e.error_code(),
            HarnessError::Config(e) => e.error_code(),
            HarnessError::Yaml(_) => "INVALID_YAML",
            HarnessError::Json(_) => "INVALID_JSON",
            HarnessError::UnknownPreset(_) => "UNKNOWN_PRESET",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substate_core::CoreError;

    #[test]
    fn test_error_codes() {
        let err = HarnessError::io(
            "machines/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("machines/missing.json"));

        let err = HarnessError::from(CoreError::AlreadyRunning);
        assert_eq!(err.error_code(), "ALREADY_RUNNING");

        let err = HarnessError::UnknownPreset("checkout".to_string());
        assert_eq!(err.error_code(), "UNKNOWN_PRESET");

        let err = HarnessError::from(serde_yaml::from_str::<Vec<String>>("{").unwrap_err());
        assert_eq!(err.error_code(), "INVALID_YAML");
    }
}
