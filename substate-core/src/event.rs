//! Events sent to an interpreter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An event delivered to a running interpreter.
///
/// Only the `type` tag takes part in transition resolution. The optional
/// payload is carried through to observers untouched.
///
/// Events deserialize from either a bare type string or an object:
///
/// ```json
/// ["START", {"type": "RENEW"}, {"type": "CANCEL", "payload": {"reason": "price"}}]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRepr")]
pub struct Event {
    /// Event type, matched against state transition tables.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Optional opaque payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

impl From<&str> for Event {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Event {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_type)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventRepr {
    Type(String),
    Object {
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        payload: Option<Value>,
    },
}

impl From<EventRepr> for Event {
    fn from(repr: EventRepr) -> Self {
        match repr {
            EventRepr::Type(event_type) => Event::new(event_type),
            EventRepr::Object {
                event_type,
                payload,
            } => Event {
                event_type,
                payload,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_shorthand_and_object() {
        let events: Vec<Event> = serde_json::from_value(json!([
            "START",
            {"type": "RENEW"},
            {"type": "CANCEL", "payload": {"reason": "price"}}
        ]))
        .unwrap();

        assert_eq!(events[0], Event::new("START"));
        assert_eq!(events[1].event_type(), "RENEW");
        assert!(events[1].payload.is_none());
        assert_eq!(events[2].payload, Some(json!({"reason": "price"})));
    }

    #[test]
    fn test_serialize_omits_empty_payload() {
        let value = serde_json::to_value(Event::new("REFUND")).unwrap();
        assert_eq!(value, json!({"type": "REFUND"}));
    }

    #[test]
    fn test_rejects_object_without_type() {
        let result: Result<Event, _> = serde_json::from_value(json!({"payload": 1}));
        assert!(result.is_err());
    }
}
