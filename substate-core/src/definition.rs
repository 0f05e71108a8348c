//! Hierarchical machine definition types.
//!
//! Machine definitions use a nested JSON DSL modelled on xstate configs:
//!
//! ```json
//! {
//!   "id": "subscription",
//!   "initial": "free",
//!   "states": {
//!     "free": { "on": { "START": "subscribed" } },
//!     "subscribed": {
//!       "initial": "autoRenewing",
//!       "states": {
//!         "autoRenewing": { "on": { "REFUND": "#subscription.expired" } },
//!         "expiring": {}
//!       }
//!     },
//!     "expired": { "initial": "churned", "states": { "churned": {} } }
//!   }
//! }
//! ```
//!
//! A bare target id (`"subscribed"`) is relative: it names a sibling of the
//! state that declares the transition (or that state itself). A target that
//! starts with `#` or contains a `.` is an absolute path from the root.

use crate::error::ConfigError;
use crate::state::{ActivePath, NodeId, StatePath};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Ordered child states of a node, in document order.
///
/// Duplicate ids are preserved while parsing so that validation can report
/// them instead of the last entry silently winning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap(Vec<(String, StateNodeConfig)>);

impl StateMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateNodeConfig)> {
        self.0.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn insert(&mut self, id: impl Into<String>, node: StateNodeConfig) {
        self.0.push((id.into(), node));
    }
}

impl Serialize for StateMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, node) in &self.0 {
            map.serialize_entry(id, node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StateMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};

        struct StateMapVisitor;

        impl<'de> Visitor<'de> for StateMapVisitor {
            type Value = StateMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of state id to state node")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut states = Vec::new();
                while let Some((id, node)) = access.next_entry::<String, StateNodeConfig>()? {
                    states.push((id, node));
                }
                Ok(StateMap(states))
            }
        }

        deserializer.deserialize_map(StateMapVisitor)
    }
}

/// Raw configuration of one state node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNodeConfig {
    /// Initial child id, required iff `states` is non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,

    /// Child states.
    #[serde(default, skip_serializing_if = "StateMap::is_empty")]
    pub states: StateMap,

    /// Transitions: event type -> target.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, String>,
}

impl StateNodeConfig {
    /// An atomic state with no transitions.
    pub fn atomic() -> Self {
        Self::default()
    }

    /// A compound state entering `initial` by default.
    pub fn compound(initial: impl Into<String>) -> Self {
        Self {
            initial: Some(initial.into()),
            ..Self::default()
        }
    }

    /// Adds a child state.
    pub fn state(mut self, id: impl Into<String>, node: StateNodeConfig) -> Self {
        self.states.insert(id, node);
        self
    }

    /// Adds a transition.
    pub fn on(mut self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.on.insert(event.into(), target.into());
        self
    }
}

/// Raw machine definition as stored/transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Root state id; also the first segment of every fully-qualified path.
    #[serde(alias = "key")]
    pub id: String,

    /// Default context for interpreters of this machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// The root state node.
    #[serde(flatten)]
    pub root: StateNodeConfig,
}

impl MachineConfig {
    pub fn new(id: impl Into<String>, root: StateNodeConfig) -> Self {
        Self {
            id: id.into(),
            context: None,
            root,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// A transition target as written in the definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// Sibling-or-self id.
    Relative(String),
    /// Fully-qualified path from the root.
    Absolute(StatePath),
}

impl TargetRef {
    /// Classifies a target string. Returns `None` for malformed paths.
    pub fn parse(target: &str) -> Option<Self> {
        if target.starts_with('#') || target.contains('.') {
            StatePath::parse(target).map(TargetRef::Absolute)
        } else if target.is_empty() {
            None
        } else {
            Some(TargetRef::Relative(target.to_string()))
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Relative(id) => f.write_str(id),
            TargetRef::Absolute(path) => write!(f, "#{}", path),
        }
    }
}

/// A transition with its target resolved at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTarget {
    pub target: TargetRef,
    pub node: NodeId,
}

/// Shape of a state node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKind {
    Atomic,
    Compound {
        initial: NodeId,
        children: Vec<NodeId>,
    },
}

/// An immutable, validated state node.
#[derive(Debug, Clone)]
pub struct StateNode {
    id: String,
    path: StatePath,
    parent: Option<NodeId>,
    kind: StateKind,
    transitions: BTreeMap<String, TransitionTarget>,
}

impl StateNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &StatePath {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, StateKind::Atomic)
    }

    pub fn initial(&self) -> Option<NodeId> {
        match &self.kind {
            StateKind::Atomic => None,
            StateKind::Compound { initial, .. } => Some(*initial),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            StateKind::Atomic => &[],
            StateKind::Compound { children, .. } => children,
        }
    }

    pub fn transitions(&self) -> &BTreeMap<String, TransitionTarget> {
        &self.transitions
    }

    pub fn transition(&self, event: &str) -> Option<&TransitionTarget> {
        self.transitions.get(event)
    }
}

/// Outcome of resolving an event against an active path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Node whose transition table handled the event, `None` if ignored.
    pub source: Option<NodeId>,

    /// Resulting active path (unchanged when ignored).
    pub path: ActivePath,
}

impl Resolution {
    pub fn is_handled(&self) -> bool {
        self.source.is_some()
    }
}

/// Validated and indexed machine definition.
#[derive(Debug, Clone)]
pub struct MachineDefinition {
    /// Arena of nodes in document (pre-)order; index 0 is the root.
    nodes: Vec<StateNode>,

    /// Fully-qualified path -> node.
    index: HashMap<String, NodeId>,

    /// Original raw definition.
    pub raw: MachineConfig,

    /// Hash of the definition for integrity checks.
    pub checksum: String,
}

impl MachineDefinition {
    /// Parses and validates a machine definition from JSON text.
    ///
    /// Prefer this over [`from_json`](Self::from_json) for untrusted input:
    /// duplicate sibling ids can only be detected before the text is folded
    /// into a `serde_json::Value`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: MachineConfig = serde_json::from_str(json)?;
        Self::from_config(raw)
    }

    /// Parses and validates a machine definition from a JSON value.
    pub fn from_json(json: &Value) -> Result<Self, ConfigError> {
        let raw = MachineConfig::deserialize(json)?;
        Self::from_config(raw)
    }

    /// Validates a raw definition and builds the node arena.
    pub fn from_config(raw: MachineConfig) -> Result<Self, ConfigError> {
        let mut builder = Builder::default();
        builder.add_node(&raw.id, &raw.root, None, None)?;
        builder.resolve_transitions()?;

        let json_bytes = serde_json::to_vec(&raw)?;
        let checksum = format!("{:08x}", crc32c::crc32c(&json_bytes));

        tracing::debug!(
            "Built machine '{}': {} states, checksum {}",
            raw.id,
            builder.nodes.len(),
            checksum
        );

        Ok(Self {
            nodes: builder.nodes,
            index: builder.index,
            raw,
            checksum,
        })
    }

    /// Machine (root state) id.
    pub fn id(&self) -> &str {
        &self.raw.id
    }

    /// Default context declared by the definition, if any.
    pub fn context(&self) -> Option<&Value> {
        self.raw.context.as_ref()
    }

    /// Deserializes the declared default context into a typed value.
    pub fn context_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ConfigError> {
        self.raw
            .context
            .as_ref()
            .map(|ctx| T::deserialize(ctx).map_err(ConfigError::from))
            .transpose()
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was produced by a different definition and is out of range.
    pub fn node(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by path: fully-qualified (`subscription.expired`),
    /// `#`-prefixed, or root-relative (`expired.churned`).
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let path = path.strip_prefix('#').unwrap_or(path);
        if let Some(id) = self.index.get(path) {
            return Some(*id);
        }
        self.index.get(&format!("{}.{}", self.id(), path)).copied()
    }

    /// All nodes in document order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &StateNode> {
        self.nodes.iter()
    }

    /// All fully-qualified state paths in document order.
    pub fn state_paths(&self) -> impl Iterator<Item = &StatePath> {
        self.nodes.iter().map(|n| &n.path)
    }

    /// Active path entered when the machine starts.
    pub fn initial_path(&self) -> ActivePath {
        self.enter(self.root())
    }

    /// Active path obtained by entering `target`: root down to `target`,
    /// then through initial children until an atomic state.
    pub fn enter(&self, target: NodeId) -> ActivePath {
        let mut nodes = Vec::new();
        let mut cursor = Some(target);
        while let Some(id) = cursor {
            nodes.push(id);
            cursor = self.node(id).parent;
        }
        nodes.reverse();

        let mut current = target;
        while let Some(initial) = self.node(current).initial() {
            nodes.push(initial);
            current = initial;
        }
        ActivePath(nodes)
    }

    /// Fully-qualified path of the active leaf.
    pub fn path_of(&self, active: &ActivePath) -> StatePath {
        match active.leaf() {
            Some(leaf) => self.node(leaf).path.clone(),
            None => self.node(self.root()).path.clone(),
        }
    }

    /// Resolves `event` against `active` without side effects.
    ///
    /// The active leaf and then each ancestor up to the root is checked in
    /// turn; the first node with a matching transition handles the event.
    pub fn transition(&self, active: &ActivePath, event: &str) -> Resolution {
        for &id in active.nodes().iter().rev() {
            if let Some(t) = self.node(id).transition(event) {
                return Resolution {
                    source: Some(id),
                    path: self.enter(t.node),
                };
            }
        }
        Resolution {
            source: None,
            path: active.clone(),
        }
    }

    /// Event types handled anywhere on the active ancestor chain, sorted.
    pub fn events_for(&self, active: &ActivePath) -> Vec<&str> {
        let events: BTreeSet<&str> = active
            .nodes()
            .iter()
            .flat_map(|&id| self.node(id).transitions.keys().map(String::as_str))
            .collect();
        events.into_iter().collect()
    }

    /// Returns the raw definition as JSON.
    pub fn to_json(&self) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(&self.raw)?)
    }
}

/// Unresolved transition collected during the first construction pass.
struct PendingTransition {
    node: NodeId,
    event: String,
    target: String,
}

#[derive(Default)]
struct Builder {
    nodes: Vec<StateNode>,
    index: HashMap<String, NodeId>,
    pending: Vec<PendingTransition>,
}

impl Builder {
    fn add_node(
        &mut self,
        id: &str,
        config: &StateNodeConfig,
        parent: Option<NodeId>,
        parent_path: Option<&StatePath>,
    ) -> Result<NodeId, ConfigError> {
        validate_id(id)?;

        let path = match parent_path {
            Some(p) => p.child(id),
            None => StatePath::new(vec![id.to_string()]),
        };
        let node_id = NodeId(self.nodes.len());
        self.index.insert(path.to_string(), node_id);
        self.nodes.push(StateNode {
            id: id.to_string(),
            path: path.clone(),
            parent,
            kind: StateKind::Atomic,
            transitions: BTreeMap::new(),
        });

        for (event, target) in &config.on {
            self.pending.push(PendingTransition {
                node: node_id,
                event: event.clone(),
                target: target.clone(),
            });
        }

        if config.states.is_empty() {
            if let Some(initial) = &config.initial {
                return Err(ConfigError::InitialWithoutChildren {
                    state: path.to_string(),
                    initial: initial.clone(),
                });
            }
            return Ok(node_id);
        }

        let initial_id = config
            .initial
            .as_deref()
            .ok_or_else(|| ConfigError::MissingInitial {
                state: path.to_string(),
            })?;

        let mut seen = HashSet::new();
        let mut children = Vec::with_capacity(config.states.len());
        let mut initial = None;
        for (child_id, child) in config.states.iter() {
            if !seen.insert(child_id) {
                return Err(ConfigError::DuplicateState {
                    parent: path.to_string(),
                    id: child_id.to_string(),
                });
            }
            let child_node = self.add_node(child_id, child, Some(node_id), Some(&path))?;
            if child_id == initial_id {
                initial = Some(child_node);
            }
            children.push(child_node);
        }

        let initial = initial.ok_or_else(|| ConfigError::UnknownInitial {
            state: path.to_string(),
            initial: initial_id.to_string(),
        })?;
        self.nodes[node_id.0].kind = StateKind::Compound { initial, children };

        Ok(node_id)
    }

    fn resolve_transitions(&mut self) -> Result<(), ConfigError> {
        for pending in std::mem::take(&mut self.pending) {
            let unresolved = || ConfigError::UnresolvedTarget {
                state: self.nodes[pending.node.0].path.to_string(),
                event: pending.event.clone(),
                target: pending.target.clone(),
            };

            let target = TargetRef::parse(&pending.target).ok_or_else(unresolved)?;
            let resolved = match &target {
                TargetRef::Relative(id) => {
                    // Siblings of the declaring state; the root resolves among its own children.
                    let scope = self.nodes[pending.node.0].parent.unwrap_or(pending.node);
                    let scope_path = &self.nodes[scope.0].path;
                    if self.nodes[pending.node.0].parent.is_none()
                        && self.nodes[pending.node.0].id == *id
                    {
                        Some(pending.node)
                    } else {
                        self.index.get(&scope_path.child(id).to_string()).copied()
                    }
                }
                TargetRef::Absolute(path) => self.index.get(&path.to_string()).copied(),
            };
            let node = resolved.ok_or_else(unresolved)?;

            self.nodes[pending.node.0]
                .transitions
                .insert(pending.event, TransitionTarget { target, node });
        }
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), ConfigError> {
    let reason = if id.is_empty() {
        "must not be empty"
    } else if id.contains('.') {
        "must not contain '.'"
    } else if id.starts_with('#') {
        "must not start with '#'"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidStateId {
        id: id.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_definition() -> Value {
        json!({
            "id": "order",
            "initial": "pending",
            "context": {"items": 0},
            "states": {
                "pending": {"on": {"PAY": "active"}},
                "active": {
                    "initial": "processing",
                    "states": {
                        "processing": {"on": {"SHIP": "shipped", "REFUND": "#order.closed.refunded"}},
                        "shipped": {"on": {"DELIVER": "order.closed"}}
                    },
                    "on": {"CANCEL": "closed"}
                },
                "closed": {
                    "initial": "delivered",
                    "states": {
                        "delivered": {},
                        "refunded": {}
                    }
                }
            }
        })
    }

    fn leaf_path(def: &MachineDefinition, active: &ActivePath) -> String {
        def.path_of(active).to_string()
    }

    #[test]
    fn test_parse_definition() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();

        assert_eq!(def.id(), "order");
        assert_eq!(def.len(), 8);
        assert_eq!(def.context(), Some(&json!({"items": 0})));
        assert_eq!(def.checksum.len(), 8);

        let paths: Vec<String> = def.state_paths().map(|p| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "order",
                "order.pending",
                "order.active",
                "order.active.processing",
                "order.active.shipped",
                "order.closed",
                "order.closed.delivered",
                "order.closed.refunded",
            ]
        );
    }

    #[test]
    fn test_node_shape() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();

        let active = def.node(def.lookup("active").unwrap());
        assert!(!active.is_atomic());
        assert_eq!(active.children().len(), 2);
        assert_eq!(
            def.node(active.initial().unwrap()).id(),
            "processing"
        );
        assert_eq!(active.parent(), Some(def.root()));

        let pending = def.node(def.lookup("order.pending").unwrap());
        assert!(pending.is_atomic());
        assert!(pending.initial().is_none());
        assert!(pending.children().is_empty());

        assert_eq!(
            def.lookup("#order.closed.refunded"),
            def.lookup("closed.refunded")
        );
        assert!(def.lookup("closed.missing").is_none());
    }

    #[test]
    fn test_initial_path_is_atomic() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let active = def.initial_path();

        assert_eq!(active.len(), 2);
        assert_eq!(leaf_path(&def, &active), "order.pending");
        assert!(def.node(active.leaf().unwrap()).is_atomic());
    }

    #[test]
    fn test_transition_resolution() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let start = def.initial_path();

        // Relative target to a compound sibling expands through its initial child
        let paid = def.transition(&start, "PAY");
        assert_eq!(paid.source, def.lookup("pending"));
        assert_eq!(leaf_path(&def, &paid.path), "order.active.processing");

        // Absolute target crossing branches
        let refunded = def.transition(&paid.path, "REFUND");
        assert_eq!(leaf_path(&def, &refunded.path), "order.closed.refunded");

        // Dotted target without '#' is absolute too
        let shipped = def.transition(&paid.path, "SHIP");
        let delivered = def.transition(&shipped.path, "DELIVER");
        assert_eq!(leaf_path(&def, &delivered.path), "order.closed.delivered");
    }

    #[test]
    fn test_ancestor_handles_event() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let processing = def.enter(def.lookup("active.processing").unwrap());

        let cancelled = def.transition(&processing, "CANCEL");
        assert_eq!(cancelled.source, def.lookup("active"));
        assert_eq!(leaf_path(&def, &cancelled.path), "order.closed.delivered");
    }

    #[test]
    fn test_unhandled_event_is_ignored() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let start = def.initial_path();

        let resolution = def.transition(&start, "DELIVER");
        assert!(!resolution.is_handled());
        assert_eq!(resolution.path, start);

        let resolution = def.transition(&start, "NOT_AN_EVENT");
        assert!(!resolution.is_handled());
    }

    #[test]
    fn test_events_for() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let processing = def.enter(def.lookup("active.processing").unwrap());

        assert_eq!(def.events_for(&processing), vec!["CANCEL", "REFUND", "SHIP"]);
        assert_eq!(def.events_for(&def.initial_path()), vec!["PAY"]);
    }

    #[test]
    fn test_root_relative_transition() {
        let json = json!({
            "id": "m",
            "initial": "a",
            "on": {"RESET": "a", "SELF": "m"},
            "states": {"a": {"on": {"GO": "b"}}, "b": {}}
        });
        let def = MachineDefinition::from_json(&json).unwrap();
        let b = def.transition(&def.initial_path(), "GO").path;
        assert_eq!(leaf_path(&def, &b), "m.b");

        let reset = def.transition(&b, "RESET");
        assert_eq!(reset.source, Some(def.root()));
        assert_eq!(leaf_path(&def, &reset.path), "m.a");

        let reentered = def.transition(&b, "SELF");
        assert_eq!(leaf_path(&def, &reentered.path), "m.a");
    }

    #[test]
    fn test_missing_initial() {
        let json = json!({
            "id": "m",
            "states": {"a": {}, "b": {}}
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(result, Err(ConfigError::MissingInitial { .. })));
    }

    #[test]
    fn test_invalid_initial_state() {
        let json = json!({
            "id": "m",
            "initial": "c",
            "states": {"a": {}, "b": {}}
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(result, Err(ConfigError::UnknownInitial { .. })));
    }

    #[test]
    fn test_initial_without_children() {
        let json = json!({
            "id": "m",
            "initial": "a",
            "states": {"a": {"initial": "x"}}
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(
            result,
            Err(ConfigError::InitialWithoutChildren { .. })
        ));
    }

    #[test]
    fn test_invalid_transition_target() {
        let json = json!({
            "id": "m",
            "initial": "a",
            "states": {"a": {"on": {"GO": "c"}}, "b": {}}
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(result, Err(ConfigError::UnresolvedTarget { .. })));

        let json = json!({
            "id": "m",
            "initial": "a",
            "states": {"a": {"on": {"GO": "#m.b.deep"}}, "b": {}}
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(result, Err(ConfigError::UnresolvedTarget { .. })));
    }

    #[test]
    fn test_relative_target_is_not_a_cousin() {
        // 'leaf' exists, but not as a sibling of 'a'
        let json = json!({
            "id": "m",
            "initial": "a",
            "states": {
                "a": {"on": {"GO": "leaf"}},
                "b": {"initial": "leaf", "states": {"leaf": {}}}
            }
        });
        let result = MachineDefinition::from_json(&json);
        assert!(matches!(result, Err(ConfigError::UnresolvedTarget { .. })));
    }

    #[test]
    fn test_duplicate_sibling_ids() {
        let json = r#"{
            "id": "m",
            "initial": "a",
            "states": {"a": {}, "a": {"on": {"GO": "a"}}}
        }"#;
        let result = MachineDefinition::from_json_str(json);
        assert!(matches!(result, Err(ConfigError::DuplicateState { .. })));
    }

    #[test]
    fn test_invalid_state_ids() {
        let dotted = json!({"id": "m", "initial": "a.b", "states": {"a.b": {}}});
        assert!(matches!(
            MachineDefinition::from_json(&dotted),
            Err(ConfigError::InvalidStateId { .. })
        ));

        let hashed = json!({"id": "#m"});
        assert!(matches!(
            MachineDefinition::from_json(&hashed),
            Err(ConfigError::InvalidStateId { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let result = MachineDefinition::from_json_str("{\"id\": ");
        assert!(matches!(result, Err(ConfigError::Json(_))));

        let result = MachineDefinition::from_json(&json!({"initial": "a"}));
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_builder_config_matches_json() {
        let built = MachineConfig::new(
            "m",
            StateNodeConfig::compound("a")
                .state("a", StateNodeConfig::atomic().on("GO", "b"))
                .state("b", StateNodeConfig::atomic()),
        );
        let parsed: MachineConfig = serde_json::from_value(json!({
            "id": "m",
            "initial": "a",
            "states": {"a": {"on": {"GO": "b"}}, "b": {}}
        }))
        .unwrap();
        assert_eq!(built, parsed);

        let a = MachineDefinition::from_config(built).unwrap();
        let b = MachineDefinition::from_config(parsed).unwrap();
        assert_eq!(a.checksum, b.checksum);
    }

    #[test]
    fn test_to_json_preserves_document_order() {
        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        let json = def.to_json().unwrap();
        let keys: Vec<&String> = json["states"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["pending", "active", "closed"]);
    }

    #[test]
    fn test_typed_context() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Ctx {
            items: u32,
        }

        let def = MachineDefinition::from_json(&sample_definition()).unwrap();
        assert_eq!(def.context_as::<Ctx>().unwrap(), Some(Ctx { items: 0 }));
    }
}
