//! Pub/Sub channel definitions.

use presence_core::{ParticipantId, RoomId};

/// Channel prefix for room typing maps
pub const TYPING_CHANNEL_PREFIX: &str = "typing:";
/// Channel prefix for participant presence states
pub const PRESENCE_CHANNEL_PREFIX: &str = "presence:";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Full typing map of a room, republished after every flag change
    Typing(RoomId),
    /// Presence state string of one participant
    Presence(ParticipantId),
    /// Any other channel name
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn typing(room_id: RoomId) -> Self {
        Self::Typing(room_id)
    }

    #[must_use]
    pub fn presence(user_id: ParticipantId) -> Self {
        Self::Presence(user_id)
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Typing(room) => format!("{TYPING_CHANNEL_PREFIX}{room}"),
            Self::Presence(user) => format!("{PRESENCE_CHANNEL_PREFIX}{user}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if let Some(room) = name
            .strip_prefix(TYPING_CHANNEL_PREFIX)
            .and_then(RoomId::parse)
        {
            return Self::Typing(room);
        }

        if let Some(user) = name
            .strip_prefix(PRESENCE_CHANNEL_PREFIX)
            .and_then(ParticipantId::parse)
        {
            return Self::Presence(user);
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
