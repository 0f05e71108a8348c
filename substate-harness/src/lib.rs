//! # substate-harness
//!
//! Configuration and scripting around the substate interpreter.
//!
//! This crate provides:
//! - Built-in machines and event scripts (the subscription lifecycle)
//! - Event script and definition file loading
//! - A script runner that records every transition into a report
//! - Layered runner configuration (defaults, YAML file, environment)

pub mod config;
pub mod error;
pub mod output;
pub mod presets;
pub mod runner;
pub mod script;

pub use config::{Config, ConfigFileError, OutputFormat};
pub use error::HarnessError;
pub use runner::{RunReport, ScriptRunner, Step};
pub use script::{load_definition, EventScript};
