//! Coordinator inputs
//!
//! Everything a conversation screen hands the coordinator on each render.
//! Identifiers are normalized on the way in, so an absent id and a blank one
//! look the same to the coordinator.

use std::time::Duration;

use presence_core::{IdentityProvider, ParticipantId, RoomId};

/// How long a typing announcement stays up without another keystroke
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_millis(4500);

/// Inputs of a participant coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantOptions {
    /// Conversation whose typing stream is observed and written
    pub room_id: Option<RoomId>,
    /// The other participant, whose presence is observed
    pub peer_id: Option<ParticipantId>,
    /// The local participant, excluded when deciding whether the peer types
    pub current_user_id: Option<ParticipantId>,
    /// When false the coordinator holds no subscriptions and ignores input
    pub enabled: bool,
    pub typing_idle: Duration,
}

impl Default for ParticipantOptions {
    fn default() -> Self {
        Self {
            room_id: None,
            peer_id: None,
            current_user_id: None,
            enabled: true,
            typing_idle: DEFAULT_TYPING_IDLE,
        }
    }
}

impl ParticipantOptions {
    /// Options for a conversation, from raw identifiers
    #[must_use]
    pub fn new(room_id: Option<&str>, peer_id: Option<&str>) -> Self {
        Self {
            room_id: RoomId::from_optional(room_id),
            peer_id: ParticipantId::from_optional(peer_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_current_user(mut self, current_user_id: Option<&str>) -> Self {
        self.current_user_id = ParticipantId::from_optional(current_user_id);
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_typing_idle(mut self, typing_idle: Duration) -> Self {
        self.typing_idle = typing_idle;
        self
    }

    /// Fill a missing local identity from `identity`.
    ///
    /// An explicitly given id always wins.
    #[must_use]
    pub fn with_identity_fallback(mut self, identity: &dyn IdentityProvider) -> Self {
        if self.current_user_id.is_none() {
            self.current_user_id = identity.current_user_id();
        }
        self
    }

    /// Room the coordinator should be attached to right now
    pub(crate) fn active_room(&self) -> Option<&RoomId> {
        self.room_id.as_ref().filter(|_| self.enabled)
    }

    /// Peer the coordinator should be watching right now
    pub(crate) fn active_peer(&self) -> Option<&ParticipantId> {
        self.peer_id.as_ref().filter(|_| self.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_core::StaticIdentity;

    #[test]
    fn test_defaults() {
        let options = ParticipantOptions::default();
        assert!(options.enabled);
        assert_eq!(options.typing_idle, Duration::from_millis(4500));
        assert!(options.room_id.is_none());
    }

    #[test]
    fn test_new_normalizes_ids() {
        let options = ParticipantOptions::new(Some("  room-42 "), Some("   "));
        assert_eq!(options.room_id.unwrap(), "room-42");
        assert!(options.peer_id.is_none());
    }

    #[test]
    fn test_identity_fallback_fills_missing_only() {
        let identity = StaticIdentity::parse("user-1");

        let options = ParticipantOptions::new(Some("room-42"), Some("agent-7"))
            .with_identity_fallback(&identity);
        assert_eq!(options.current_user_id.unwrap(), "user-1");

        let options = ParticipantOptions::new(Some("room-42"), Some("agent-7"))
            .with_current_user(Some("user-9"))
            .with_identity_fallback(&identity);
        assert_eq!(options.current_user_id.unwrap(), "user-9");
    }

    #[test]
    fn test_blank_current_user_falls_back() {
        let identity = StaticIdentity::parse("user-1");
        let options = ParticipantOptions::new(Some("room-42"), None)
            .with_current_user(Some(" "))
            .with_identity_fallback(&identity);
        assert_eq!(options.current_user_id.unwrap(), "user-1");
    }

    #[test]
    fn test_disabled_has_no_active_targets() {
        let options = ParticipantOptions::new(Some("room-42"), Some("agent-7")).with_enabled(false);
        assert!(options.active_room().is_none());
        assert!(options.active_peer().is_none());

        let options = options.with_enabled(true);
        assert_eq!(options.active_room().unwrap(), "room-42");
        assert_eq!(options.active_peer().unwrap(), "agent-7");
    }
}
