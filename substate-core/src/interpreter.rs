//! Interpreter - drives a machine definition with events.

use crate::definition::MachineDefinition;
use crate::error::{CoreError, ObserverError};
use crate::event::Event;
use crate::state::{ActivePath, Snapshot, StatePath};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Interpreter lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpreterStatus {
    /// Constructed, not yet started.
    #[default]
    Idle,
    /// Accepting events.
    Running,
    /// Stopped; terminal.
    Stopped,
}

impl fmt::Display for InterpreterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterpreterStatus::Idle => "idle",
            InterpreterStatus::Running => "running",
            InterpreterStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Handle returned by [`Interpreter::on_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer<C> = Box<dyn FnMut(&Snapshot<C>, Option<&Event>) -> Result<(), ObserverError>>;

/// Result of sending an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: StatePath,
    pub to: StatePath,
    pub event: Event,
    /// State whose transition table handled the event.
    pub handled_by: Option<StatePath>,
    /// True when a transition matched, including self-transitions.
    /// False when the event was ignored.
    pub handled: bool,
}

/// Runs one machine definition.
///
/// The interpreter owns the active path and context; both are replaced as a
/// whole on every transition. Observers run synchronously, in registration
/// order, after the new state has been committed.
pub struct Interpreter<C = Value> {
    definition: Arc<MachineDefinition>,
    status: InterpreterStatus,
    active: ActivePath,
    context: C,
    default_context: C,
    observers: Vec<(ObserverId, Observer<C>)>,
    next_observer_id: u64,
}

impl<C: Clone + Default> Interpreter<C> {
    /// Creates an idle interpreter whose default context is `C::default()`.
    pub fn new(definition: impl Into<Arc<MachineDefinition>>) -> Self {
        let definition = definition.into();
        let active = definition.initial_path();
        Self {
            definition,
            status: InterpreterStatus::Idle,
            active,
            context: C::default(),
            default_context: C::default(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Sets the context used by `start` when none is passed.
    pub fn with_default_context(mut self, context: C) -> Self {
        self.context = context.clone();
        self.default_context = context;
        self
    }

    pub fn definition(&self) -> &Arc<MachineDefinition> {
        &self.definition
    }

    pub fn status(&self) -> InterpreterStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == InterpreterStatus::Running
    }

    pub fn active_path(&self) -> &ActivePath {
        &self.active
    }

    /// Registers an observer, called on `start` and on every `send`.
    pub fn on_transition<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&Snapshot<C>, Option<&Event>) -> Result<(), ObserverError> + 'static,
    {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Unregisters an observer. Returns false if it was not registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Starts the interpreter in the machine's initial state.
    pub fn start(&mut self, context: Option<C>) -> Result<(), CoreError> {
        let root = self.definition.root();
        self.start_from(root, context)
    }

    /// Starts the interpreter in the state at `path` (root-relative or
    /// fully-qualified), entering its initial children if it is compound.
    pub fn start_at(&mut self, path: &str, context: Option<C>) -> Result<(), CoreError> {
        self.check_startable()?;
        let node = self
            .definition
            .lookup(path)
            .ok_or_else(|| CoreError::UnknownState {
                path: path.to_string(),
            })?;
        self.start_from(node, context)
    }

    fn start_from(
        &mut self,
        node: crate::state::NodeId,
        context: Option<C>,
    ) -> Result<(), CoreError> {
        self.check_startable()?;

        self.active = self.definition.enter(node);
        self.context = context.unwrap_or_else(|| self.default_context.clone());
        self.status = InterpreterStatus::Running;

        tracing::info!(
            "Interpreter for '{}' started in {}",
            self.definition.id(),
            self.definition.path_of(&self.active)
        );

        self.notify(None)
    }

    fn check_startable(&self) -> Result<(), CoreError> {
        match self.status {
            InterpreterStatus::Idle => Ok(()),
            InterpreterStatus::Running => Err(CoreError::AlreadyRunning),
            InterpreterStatus::Stopped => Err(CoreError::NotRunning {
                status: self.status,
            }),
        }
    }

    /// Sends an event.
    ///
    /// Events with no matching transition on the active ancestor chain are
    /// ignored: the state stays as it is and observers still fire.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<Transition, CoreError> {
        let event = event.into();
        if !self.is_running() {
            return Err(CoreError::NotRunning {
                status: self.status,
            });
        }

        let from = self.definition.path_of(&self.active);
        let resolution = self.definition.transition(&self.active, event.event_type());
        let handled_by = resolution
            .source
            .map(|id| self.definition.node(id).path().clone());
        let handled = resolution.is_handled();

        self.active = resolution.path;
        let to = self.definition.path_of(&self.active);

        match &handled_by {
            Some(source) => tracing::debug!(
                "{}: {} -> {} on {} (handled by {})",
                self.definition.id(),
                from,
                to,
                event,
                source
            ),
            None => tracing::debug!(
                "{}: event {} ignored in {}",
                self.definition.id(),
                event,
                from
            ),
        }

        self.notify(Some(&event))?;

        Ok(Transition {
            from,
            to,
            event,
            handled_by,
            handled,
        })
    }

    /// Stops the interpreter and drops all observers.
    pub fn stop(&mut self) -> Result<(), CoreError> {
        if !self.is_running() {
            return Err(CoreError::NotRunning {
                status: self.status,
            });
        }
        self.status = InterpreterStatus::Stopped;
        self.observers.clear();

        tracing::info!(
            "Interpreter for '{}' stopped in {}",
            self.definition.id(),
            self.definition.path_of(&self.active)
        );
        Ok(())
    }

    /// Returns the current state path and a copy of the context.
    pub fn current_state(&self) -> Snapshot<C> {
        Snapshot {
            path: self.definition.path_of(&self.active),
            context: self.context.clone(),
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Event types that would be handled in the current state.
    pub fn available_events(&self) -> Vec<&str> {
        self.definition.events_for(&self.active)
    }

    fn notify(&mut self, event: Option<&Event>) -> Result<(), CoreError> {
        if self.observers.is_empty() {
            return Ok(());
        }
        let snapshot = self.current_state();
        for (id, observer) in self.observers.iter_mut() {
            if let Err(source) = observer(&snapshot, event) {
                tracing::warn!(
                    "Observer {:?} failed in {}: {}",
                    id,
                    snapshot.path,
                    source
                );
                return Err(CoreError::Observer { source });
            }
        }
        Ok(())
    }
}

impl Interpreter<Value> {
    /// Creates an interpreter whose default context is the one declared by
    /// the definition (`null` if none).
    pub fn from_definition(definition: impl Into<Arc<MachineDefinition>>) -> Self {
        let definition = definition.into();
        let context = definition.context().cloned().unwrap_or_default();
        Self::new(definition).with_default_context(context)
    }
}

impl<C: fmt::Debug> fmt::Debug for Interpreter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("machine", &self.definition.id())
            .field("status", &self.status)
            .field("active", &self.definition.path_of(&self.active))
            .field("context", &self.context)
            .field("observers", &self.observers.len())
            .finish()
    }
}
