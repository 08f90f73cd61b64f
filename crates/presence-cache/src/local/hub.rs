//! In-process presence hub.
//!
//! Keeps room typing maps and participant presence in `DashMap`s and fans
//! changes out to listeners synchronously. Listeners are never invoked while
//! a map shard is locked, so a callback may call back into the hub.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use presence_core::{
    ChannelResult, IdentityProvider, ParticipantId, PresenceCallback, PresenceChannel,
    PresenceError, PresenceState, RoomId, Subscription, TypingCallback, TypingMap,
};
use serde_json::Value;
use uuid::Uuid;

/// Operations observed by the hub, in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    TypingSubscribed { room: RoomId },
    TypingReleased { room: RoomId },
    PresenceSubscribed { user: ParticipantId },
    PresenceReleased { user: ParticipantId },
    DisconnectRegistered { room: RoomId, user: ParticipantId },
    TypingSet { room: RoomId, user: ParticipantId, is_typing: bool },
    PresenceSet { user: ParticipantId, state: PresenceState },
    Disconnected { user: ParticipantId },
}

struct Listener<C> {
    id: Uuid,
    callback: C,
}

#[derive(Default)]
struct HubInner {
    rooms: DashMap<RoomId, TypingMap>,
    presence: DashMap<ParticipantId, PresenceState>,
    typing_listeners: DashMap<RoomId, Vec<Listener<TypingCallback>>>,
    presence_listeners: DashMap<ParticipantId, Vec<Listener<PresenceCallback>>>,
    /// Rooms each participant asked to be cleaned up on disconnect
    disconnect_rooms: DashMap<ParticipantId, HashSet<RoomId>>,
    journal: Mutex<Vec<HubEvent>>,
}

/// Shared in-process realtime backend
#[derive(Clone, Default)]
pub struct LocalPresenceHub {
    inner: Arc<HubInner>,
}

impl LocalPresenceHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel session for a participant
    #[must_use]
    pub fn session(&self, user_id: Option<ParticipantId>) -> LocalPresenceSession {
        LocalPresenceSession {
            hub: self.clone(),
            user_id,
        }
    }

    /// Open a channel session from a raw participant id
    #[must_use]
    pub fn session_for(&self, raw_user_id: &str) -> LocalPresenceSession {
        self.session(ParticipantId::parse(raw_user_id))
    }

    /// Current typing map of a room
    #[must_use]
    pub fn typing_map(&self, room_id: &RoomId) -> TypingMap {
        self.inner
            .rooms
            .get(room_id)
            .map(|map| map.value().clone())
            .unwrap_or_default()
    }

    /// Current presence state of a participant
    #[must_use]
    pub fn presence_of(&self, user_id: &ParticipantId) -> PresenceState {
        self.inner
            .presence
            .get(user_id)
            .map(|state| state.value().clone())
            .unwrap_or_default()
    }

    /// Report a participant's presence and notify watchers
    pub fn set_presence(&self, user_id: &ParticipantId, state: PresenceState) {
        self.inner.presence.insert(user_id.clone(), state.clone());
        self.record(HubEvent::PresenceSet {
            user: user_id.clone(),
            state: state.clone(),
        });
        self.notify_presence(user_id, state.as_str());
    }

    /// Simulate a participant dropping off: registered typing flags are
    /// cleared and the participant goes offline
    pub fn disconnect(&self, user_id: &ParticipantId) {
        self.record(HubEvent::Disconnected {
            user: user_id.clone(),
        });

        let rooms = self
            .inner
            .disconnect_rooms
            .remove(user_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();

        for room_id in rooms {
            if self.typing_map(&room_id).is_typing(user_id.as_str()) {
                self.write_typing(&room_id, user_id, false);
            }
        }

        self.set_presence(user_id, PresenceState::Offline);
    }

    /// Deliver an arbitrary payload to a room's typing listeners
    pub fn push_typing_payload(&self, room_id: &RoomId, payload: &Value) {
        self.notify_typing(room_id, payload);
    }

    #[must_use]
    pub fn typing_listener_count(&self, room_id: &RoomId) -> usize {
        self.inner
            .typing_listeners
            .get(room_id)
            .map_or(0, |listeners| listeners.len())
    }

    #[must_use]
    pub fn presence_listener_count(&self, user_id: &ParticipantId) -> usize {
        self.inner
            .presence_listeners
            .get(user_id)
            .map_or(0, |listeners| listeners.len())
    }

    /// Everything the hub has seen so far
    #[must_use]
    pub fn journal(&self) -> Vec<HubEvent> {
        self.inner.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.inner.journal.lock().clear();
    }

    fn record(&self, event: HubEvent) {
        tracing::trace!(?event, "Hub event");
        self.inner.journal.lock().push(event);
    }

    fn write_typing(&self, room_id: &RoomId, user_id: &ParticipantId, is_typing: bool) {
        let payload = {
            let mut map = self.inner.rooms.entry(room_id.clone()).or_default();
            if is_typing {
                map.set(user_id, true);
            } else {
                map.remove(user_id);
            }
            map.to_value()
        };

        self.record(HubEvent::TypingSet {
            room: room_id.clone(),
            user: user_id.clone(),
            is_typing,
        });
        self.notify_typing(room_id, &payload);
    }

    fn notify_typing(&self, room_id: &RoomId, payload: &Value) {
        let callbacks: Vec<TypingCallback> = self
            .inner
            .typing_listeners
            .get(room_id)
            .map(|listeners| listeners.iter().map(|l| l.callback.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(payload.clone());
        }
    }

    fn notify_presence(&self, user_id: &ParticipantId, state: &str) {
        let callbacks: Vec<PresenceCallback> = self
            .inner
            .presence_listeners
            .get(user_id)
            .map(|listeners| listeners.iter().map(|l| l.callback.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(state.to_string());
        }
    }

    fn add_typing_listener(&self, room_id: &RoomId, callback: TypingCallback) -> Subscription {
        let id = Uuid::new_v4();
        self.inner
            .typing_listeners
            .entry(room_id.clone())
            .or_default()
            .push(Listener {
                id,
                callback: callback.clone(),
            });
        self.record(HubEvent::TypingSubscribed {
            room: room_id.clone(),
        });

        callback(self.typing_map(room_id).to_value());

        let hub = self.clone();
        let room_id = room_id.clone();
        Subscription::new(format!("typing:{room_id}"), move || {
            hub.inner
                .typing_listeners
                .alter(&room_id, |_, mut listeners| {
                    listeners.retain(|l| l.id != id);
                    listeners
                });
            hub.inner
                .typing_listeners
                .remove_if(&room_id, |_, listeners| listeners.is_empty());
            hub.record(HubEvent::TypingReleased { room: room_id });
        })
    }

    fn add_presence_listener(
        &self,
        user_id: &ParticipantId,
        callback: PresenceCallback,
    ) -> Subscription {
        let id = Uuid::new_v4();
        self.inner
            .presence_listeners
            .entry(user_id.clone())
            .or_default()
            .push(Listener {
                id,
                callback: callback.clone(),
            });
        self.record(HubEvent::PresenceSubscribed {
            user: user_id.clone(),
        });

        callback(self.presence_of(user_id).to_string());

        let hub = self.clone();
        let user_id = user_id.clone();
        Subscription::new(format!("presence:{user_id}"), move || {
            hub.inner
                .presence_listeners
                .alter(&user_id, |_, mut listeners| {
                    listeners.retain(|l| l.id != id);
                    listeners
                });
            hub.inner
                .presence_listeners
                .remove_if(&user_id, |_, listeners| listeners.is_empty());
            hub.record(HubEvent::PresenceReleased { user: user_id });
        })
    }
}

/// A hub session bound to one participant
#[derive(Clone)]
pub struct LocalPresenceSession {
    hub: LocalPresenceHub,
    user_id: Option<ParticipantId>,
}

impl LocalPresenceSession {
    #[must_use]
    pub fn hub(&self) -> &LocalPresenceHub {
        &self.hub
    }

    fn session_user(&self) -> ChannelResult<&ParticipantId> {
        self.user_id.as_ref().ok_or(PresenceError::Unauthenticated)
    }
}

impl IdentityProvider for LocalPresenceSession {
    fn current_user_id(&self) -> Option<ParticipantId> {
        self.user_id.clone()
    }
}

#[async_trait]
impl PresenceChannel for LocalPresenceSession {
    async fn subscribe_to_user_presence(
        &self,
        user_id: &ParticipantId,
        callback: PresenceCallback,
    ) -> ChannelResult<Subscription> {
        Ok(self.hub.add_presence_listener(user_id, callback))
    }

    async fn subscribe_to_typing(
        &self,
        room_id: &RoomId,
        callback: TypingCallback,
    ) -> ChannelResult<Subscription> {
        Ok(self.hub.add_typing_listener(room_id, callback))
    }

    async fn set_typing(&self, room_id: &RoomId, is_typing: bool) -> ChannelResult<()> {
        let user_id = self.session_user()?;
        self.hub.write_typing(room_id, user_id, is_typing);
        Ok(())
    }

    async fn register_typing_on_disconnect(&self, room_id: &RoomId) -> ChannelResult<()> {
        let user_id = self.session_user()?;
        self.hub
            .inner
            .disconnect_rooms
            .entry(user_id.clone())
            .or_default()
            .insert(room_id.clone());
        self.hub.record(HubEvent::DisconnectRegistered {
            room: room_id.clone(),
            user: user_id.clone(),
        });
        Ok(())
    }
}
