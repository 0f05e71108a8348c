//! Script runner - drives an interpreter through an event script.

use crate::error::HarnessError;
use crate::script::EventScript;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use substate_core::{
    CoreError, Event, Interpreter, InterpreterStatus, MachineDefinition, ObserverError, Snapshot,
    StatePath,
};

/// Outcome of one scripted event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub event: Event,
    /// Fully-qualified state after the event.
    pub state: StatePath,
    /// xstate-style value of `state`.
    pub value: Value,
    /// False when the event was ignored.
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// Result of running a script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub machine: String,
    pub checksum: String,
    pub initial: StatePath,
    pub initial_value: Value,
    pub steps: Vec<Step>,
    pub context: Value,
    pub status: InterpreterStatus,
}

impl RunReport {
    /// Root-relative state after each step, in order.
    pub fn states(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.state.relative()).collect()
    }

    /// Final fully-qualified state.
    pub fn final_state(&self) -> &StatePath {
        self.steps.last().map(|s| &s.state).unwrap_or(&self.initial)
    }

    pub fn error_count(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Runs event scripts against one machine definition.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    definition: Arc<MachineDefinition>,
    stop_on_error: bool,
}

impl ScriptRunner {
    pub fn new(definition: impl Into<Arc<MachineDefinition>>) -> Self {
        Self {
            definition: definition.into(),
            stop_on_error: true,
        }
    }

    /// Whether an interpreter error aborts the run (default) or is recorded
    /// on the step and the run continues.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn definition(&self) -> &Arc<MachineDefinition> {
        &self.definition
    }

    /// Runs `script` and returns the report.
    pub fn run(&self, script: &EventScript) -> Result<RunReport, HarnessError> {
        self.run_with(script, |_, _| Ok(()))
    }

    /// Runs `script`, additionally passing every transition to `observer`.
    pub fn run_with<F>(&self, script: &EventScript, observer: F) -> Result<RunReport, HarnessError>
    where
        F: FnMut(&Snapshot, Option<&Event>) -> Result<(), ObserverError> + 'static,
    {
        let mut interpreter = Interpreter::from_definition(self.definition.clone());

        let machine = self.definition.id().to_string();
        interpreter.on_transition(move |snapshot, event| {
            match event {
                Some(event) => tracing::info!("{}: {} -> {}", machine, event, snapshot.path),
                None => tracing::info!("{}: started in {}", machine, snapshot.path),
            }
            Ok(())
        });
        interpreter.on_transition(observer);

        match &script.start_at {
            Some(path) => interpreter.start_at(path, script.context.clone())?,
            None => interpreter.start(script.context.clone())?,
        }

        let initial = interpreter.current_state().path;
        let mut steps = Vec::with_capacity(script.events.len());

        for event in &script.events {
            let step = match interpreter.send(event.clone()) {
                Ok(transition) => Step {
                    event: transition.event,
                    value: transition.to.value(),
                    state: transition.to,
                    handled: transition.handled,
                    error: None,
                    error_code: None,
                },
                Err(e) if self.stop_on_error => return Err(e.into()),
                Err(e) => self.failed_step(&interpreter, event, e),
            };
            steps.push(step);
        }

        interpreter.stop()?;

        Ok(RunReport {
            machine: self.definition.id().to_string(),
            checksum: self.definition.checksum.clone(),
            initial_value: initial.value(),
            initial,
            steps,
            context: interpreter.context().clone(),
            status: interpreter.status(),
        })
    }

    fn failed_step(&self, interpreter: &Interpreter, event: &Event, error: CoreError) -> Step {
        tracing::warn!("Event {} failed [{}]: {}", event, error.error_code(), error);
        let state = interpreter.current_state().path;
        Step {
            event: event.clone(),
            value: state.value(),
            state,
            handled: false,
            error: Some(error.to_string()),
            error_code: Some(error.error_code()),
        }
    }
}
