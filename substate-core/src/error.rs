//! Core error types.

use crate::interpreter::InterpreterStatus;
use thiserror::Error;

/// Boxed error returned by a failing transition observer.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors detected while building a machine definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("compound state '{state}' has no initial child")]
    MissingInitial { state: String },

    #[error("initial state '{initial}' is not a child of '{state}'")]
    UnknownInitial { state: String, initial: String },

    #[error("atomic state '{state}' declares initial '{initial}' but has no children")]
    InitialWithoutChildren { state: String, initial: String },

    #[error("duplicate state id '{id}' under '{parent}'")]
    DuplicateState { parent: String, id: String },

    #[error("invalid state id '{id}': {reason}")]
    InvalidStateId { id: String, reason: &'static str },

    #[error("transition target '{target}' on event '{event}' in state '{state}' does not resolve")]
    UnresolvedTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Stable code printed by the binaries and recorded on failed steps.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingInitial { .. } => "MISSING_INITIAL",
            ConfigError::UnknownInitial { .. } => "UNKNOWN_INITIAL",
            ConfigError::InitialWithoutChildren { .. } => "INITIAL_WITHOUT_CHILDREN",
            ConfigError::DuplicateState { .. } => "DUPLICATE_STATE",
            ConfigError::InvalidStateId { .. } => "INVALID_STATE_ID",
            ConfigError::UnresolvedTarget { .. } => "UNRESOLVED_TARGET",
            ConfigError::Json(_) => "INVALID_JSON",
        }
    }
}

/// Errors from the interpreter.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid machine definition: {0}")]
    Config(#[from] ConfigError),

    #[error("interpreter is not running (status: {status})")]
    NotRunning { status: InterpreterStatus },

    #[error("interpreter is already running")]
    AlreadyRunning,

    #[error("state not found: {path}")]
    UnknownState { path: String },

    #[error("transition observer failed: {source}")]
    Observer {
        #[source]
        source: ObserverError,
    },
}

impl CoreError {
    /// Stable code printed by the binaries and recorded on failed steps.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Config(e) => e.error_code(),
            CoreError::NotRunning { .. } => "NOT_RUNNING",
            CoreError::AlreadyRunning => "ALREADY_RUNNING",
            CoreError::UnknownState { .. } => "STATE_NOT_FOUND",
            CoreError::Observer { .. } => "OBSERVER_FAILED",
        }
    }

    /// Returns whether the error is a lifecycle violation (wrong interpreter status).
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            CoreError::NotRunning { .. } | CoreError::AlreadyRunning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CoreError::NotRunning {
            status: InterpreterStatus::Stopped,
        };
        assert_eq!(err.error_code(), "NOT_RUNNING");
        assert!(err.is_lifecycle());
        assert_eq!(
            err.to_string(),
            "interpreter is not running (status: stopped)"
        );

        let err = CoreError::from(ConfigError::MissingInitial {
            state: "subscribed".to_string(),
        });
        assert_eq!(err.error_code(), "MISSING_INITIAL");
        assert!(!err.is_lifecycle());
    }

    #[test]
    fn test_config_error_codes_are_distinct() {
        let errors = [
            ConfigError::MissingInitial {
                state: "subscribed".to_string(),
            },
            ConfigError::UnknownInitial {
                state: "subscribed".to_string(),
                initial: "paused".to_string(),
            },
            ConfigError::InitialWithoutChildren {
                state: "free".to_string(),
                initial: "trial".to_string(),
            },
            ConfigError::DuplicateState {
                parent: "subscription".to_string(),
                id: "free".to_string(),
            },
            ConfigError::InvalidStateId {
                id: "a.b".to_string(),
                reason: "contains '.'",
            },
            ConfigError::UnresolvedTarget {
                state: "free".to_string(),
                event: "START".to_string(),
                target: "nowhere".to_string(),
            },
            ConfigError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err()),
        ];
        let codes: Vec<&str> = errors.iter().map(ConfigError::error_code).collect();
        assert_eq!(
            codes,
            vec![
                "MISSING_INITIAL",
                "UNKNOWN_INITIAL",
                "INITIAL_WITHOUT_CHILDREN",
                "DUPLICATE_STATE",
                "INVALID_STATE_ID",
                "UNRESOLVED_TARGET",
                "INVALID_JSON",
            ]
        );
    }

    #[test]
    fn test_observer_error_source() {
        use std::error::Error as _;

        let err = CoreError::Observer {
            source: "sink closed".into(),
        };
        assert_eq!(err.error_code(), "OBSERVER_FAILED");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("sink closed"));
    }
}
