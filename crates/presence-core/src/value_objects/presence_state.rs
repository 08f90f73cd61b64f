//! Reported presence state of a participant

use serde::{Deserialize, Serialize};
use std::fmt;

/// Presence state as reported by the realtime backend.
///
/// Only [`PresenceState::Online`] counts as online; every other value,
/// including ones this client does not know about, is treated as offline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresenceState {
    Online,
    Away,
    Idle,
    Dnd,
    #[default]
    Offline,
    /// A state string this client does not recognise
    Unknown(String),
}

impl PresenceState {
    /// Map a raw state string. Matching is exact: `"Online"` is not online.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "online" => Self::Online,
            "away" => Self::Away,
            "idle" => Self::Idle,
            "dnd" => Self::Dnd,
            "offline" => Self::Offline,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PresenceState {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for PresenceState {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<PresenceState> for String {
    fn from(state: PresenceState) -> Self {
        state.as_str().to_string()
    }
}
