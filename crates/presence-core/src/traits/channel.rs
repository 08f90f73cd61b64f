//! Presence channel and identity ports
//!
//! A presence channel is a session against some realtime backend, bound to
//! one local identity. Typing flags written through it belong to that
//! identity; subscriptions observe everybody.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PresenceError;
use crate::traits::Subscription;
use crate::value_objects::{ParticipantId, RoomId};

/// Result type for presence channel operations
pub type ChannelResult<T> = Result<T, PresenceError>;

/// Receives the raw state string every time a participant's presence changes
pub type PresenceCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Receives the raw typing map every time a room's typing flags change
pub type TypingCallback = Arc<dyn Fn(Value) + Send + Sync>;

#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Observe a participant's presence state.
    ///
    /// Implementations deliver the current state once the subscription is
    /// live and then every change until the returned handle is released.
    async fn subscribe_to_user_presence(
        &self,
        user_id: &ParticipantId,
        callback: PresenceCallback,
    ) -> ChannelResult<Subscription>;

    /// Observe a room's typing map
    async fn subscribe_to_typing(
        &self,
        room_id: &RoomId,
        callback: TypingCallback,
    ) -> ChannelResult<Subscription>;

    /// Publish the session identity's typing flag for a room
    async fn set_typing(&self, room_id: &RoomId, is_typing: bool) -> ChannelResult<()>;

    /// Ask the backend to clear this session's typing flag in `room_id` if
    /// the session goes away without doing it itself
    async fn register_typing_on_disconnect(&self, room_id: &RoomId) -> ChannelResult<()>;
}

/// Source of the currently authenticated participant
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<ParticipantId>;
}

/// Identity fixed at construction time
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<ParticipantId>);

impl StaticIdentity {
    #[must_use]
    pub fn new(user_id: Option<ParticipantId>) -> Self {
        Self(user_id)
    }

    /// Identity from a raw id; blank input yields an anonymous identity
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(ParticipantId::parse(raw))
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<ParticipantId> {
        self.0.clone()
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn current_user_id(&self) -> Option<ParticipantId> {
        (**self).current_user_id()
    }
}
