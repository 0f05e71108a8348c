//! # substate-core
//!
//! Hierarchical state machine interpreter for substate.
//!
//! This crate provides:
//! - Nested machine definition parsing and validation
//! - Event resolution along the active state's ancestor chain
//! - Relative and absolute (`#root.a.b`) transition targets
//! - An interpreter with an explicit start/stop lifecycle and transition observers

pub mod definition;
pub mod error;
pub mod event;
pub mod interpreter;
pub mod state;

pub use definition::{
    MachineConfig, MachineDefinition, Resolution, StateKind, StateNode, StateNodeConfig, TargetRef,
};
pub use error::{ConfigError, CoreError, ObserverError};
pub use event::Event;
pub use interpreter::{Interpreter, InterpreterStatus, ObserverId, Transition};
pub use state::{ActivePath, NodeId, Snapshot, StatePath};
