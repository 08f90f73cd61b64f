//! Per-room typing map
//!
//! The backend publishes one flag per participant. A `false` flag and a
//! missing key mean the same thing, so the map only ever answers "who is
//! typing right now".

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::PresenceError;
use crate::value_objects::{normalize_id, ParticipantId};

/// Snapshot of the typing flags published for one room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingMap {
    flags: BTreeMap<String, bool>,
}

impl TypingMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw payload from the typing stream.
    ///
    /// `null` is an empty room. An object is read key by key with
    /// JavaScript-style truthiness for the values. Anything else is malformed.
    pub fn from_value(payload: &Value) -> Result<Self, PresenceError> {
        match payload {
            Value::Null => Ok(Self::new()),
            Value::Object(entries) => {
                let flags = entries
                    .iter()
                    .filter_map(|(key, value)| {
                        normalize_id(Some(key)).map(|id| (id, is_truthy(value)))
                    })
                    .collect();
                Ok(Self { flags })
            }
            other => Err(PresenceError::MalformedTypingMap(format!(
                "expected an object, got {}",
                value_kind(other)
            ))),
        }
    }

    /// Set a participant's flag
    pub fn set(&mut self, participant: &ParticipantId, is_typing: bool) {
        self.flags.insert(participant.as_str().to_string(), is_typing);
    }

    /// Drop a participant's flag entirely
    pub fn remove(&mut self, participant: &ParticipantId) -> bool {
        self.flags.remove(participant.as_str()).is_some()
    }

    /// Check whether a participant is flagged as typing
    #[must_use]
    pub fn is_typing(&self, participant: &str) -> bool {
        self.flags.get(participant).copied().unwrap_or(false)
    }

    /// Ids currently flagged `true`, in key order
    #[must_use]
    pub fn typing_users(&self) -> Vec<String> {
        self.flags
            .iter()
            .filter(|(_, typing)| **typing)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether nobody in the room is typing
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        !self.flags.values().any(|typing| *typing)
    }

    /// Render the map the way the typing stream publishes it
    #[must_use]
    pub fn to_value(&self) -> Value {
        let entries: Map<String, Value> = self
            .flags
            .iter()
            .map(|(id, typing)| (id.clone(), Value::Bool(*typing)))
            .collect();
        Value::Object(entries)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
