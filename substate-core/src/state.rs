//! Active state representation: paths, active configurations and snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Index of a node inside a [`MachineDefinition`](crate::MachineDefinition) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fully-qualified state path, root id first.
///
/// Displays as the dot-joined segments, e.g. `subscription.subscribed.autoRenewing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StatePath(Vec<String>);

impl StatePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parses a dot-separated path, ignoring a leading `#`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.is_empty() {
            return None;
        }
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return None;
        }
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Root id (first segment).
    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    /// Id of the deepest state on the path.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The path with the root id stripped, e.g. `subscribed.autoRenewing`.
    pub fn relative(&self) -> String {
        self.0.iter().skip(1).cloned().collect::<Vec<_>>().join(".")
    }

    /// Returns a new path with `id` appended.
    pub fn child(&self, id: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &StatePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Renders the path as an xstate-style state value.
    ///
    /// A top-level atomic state is a plain string (`"free"`); nested states
    /// become single-key objects (`{"subscribed": "autoRenewing"}`).
    pub fn value(&self) -> Value {
        let mut segments = self.0.iter().skip(1).rev();
        let Some(leaf) = segments.next() else {
            return Value::Object(serde_json::Map::new());
        };
        let mut value = Value::String(leaf.clone());
        for parent in segments {
            let mut map = serde_json::Map::new();
            map.insert(parent.clone(), value);
            value = Value::Object(map);
        }
        value
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<StatePath> for String {
    fn from(path: StatePath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for StatePath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        StatePath::parse(&s).ok_or_else(|| format!("invalid state path '{}'", s))
    }
}

/// Ordered node indices from the root to the active leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivePath(pub(crate) Vec<NodeId>);

impl ActivePath {
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// The deepest active node.
    pub fn leaf(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Point-in-time view of an interpreter: active path plus context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<C = Value> {
    /// Fully-qualified active path.
    pub path: StatePath,

    /// Context carried alongside the state.
    pub context: C,
}

impl<C> Snapshot<C> {
    /// Returns the xstate-style state value of the active path.
    pub fn value(&self) -> Value {
        self.path.value()
    }

    /// Returns true if the active path lies within `path`.
    ///
    /// `path` is root-relative (`"subscribed"`, `"expired.churned"`) or
    /// fully-qualified (`"subscription.expired"`).
    pub fn matches(&self, path: &str) -> bool {
        let Some(query) = StatePath::parse(path) else {
            return false;
        };
        if query.root() == self.path.root() && self.path.starts_with(&query) {
            return true;
        }
        self.path.segments().len() > query.depth()
            && self.path.segments()[1..].starts_with(query.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> StatePath {
        StatePath::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let p = path("#subscription.expired.inBillingRetry");
        assert_eq!(p.root(), "subscription");
        assert_eq!(p.leaf(), "inBillingRetry");
        assert_eq!(p.to_string(), "subscription.expired.inBillingRetry");
        assert_eq!(p.relative(), "expired.inBillingRetry");

        assert!(StatePath::parse("").is_none());
        assert!(StatePath::parse("a..b").is_none());
        assert!(StatePath::parse("#").is_none());
    }

    #[test]
    fn test_state_value() {
        assert_eq!(path("subscription.free").value(), json!("free"));
        assert_eq!(
            path("subscription.subscribed.autoRenewing").value(),
            json!({"subscribed": "autoRenewing"})
        );
        assert_eq!(path("m.a.b.c").value(), json!({"a": {"b": "c"}}));
        assert_eq!(path("m").value(), json!({}));
    }

    #[test]
    fn test_snapshot_matches() {
        let snapshot = Snapshot {
            path: path("subscription.expired.churned"),
            context: Value::Null,
        };

        assert!(snapshot.matches("expired"));
        assert!(snapshot.matches("expired.churned"));
        assert!(snapshot.matches("subscription.expired"));
        assert!(snapshot.matches("subscription"));
        assert!(!snapshot.matches("subscribed"));
        assert!(!snapshot.matches("expired.inBillingRetry"));
        assert!(!snapshot.matches(""));
    }

    #[test]
    fn test_path_serde_as_string() {
        let p = path("subscription.free");
        assert_eq!(serde_json::to_value(&p).unwrap(), json!("subscription.free"));

        let parsed: StatePath = serde_json::from_value(json!("subscription.free")).unwrap();
        assert_eq!(parsed, p);
        assert!(serde_json::from_value::<StatePath>(json!("a..b")).is_err());
    }
}
