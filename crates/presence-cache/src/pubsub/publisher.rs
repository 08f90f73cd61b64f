//! Redis Pub/Sub publisher.

use presence_core::{ParticipantId, PresenceState, RoomId, TypingMap};

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;

/// Publishes typing maps and presence states
#[derive(Clone, Debug)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish a raw message to a channel
    pub async fn publish_raw(&self, channel: &PubSubChannel, message: &str) -> RedisResult<u32> {
        let channel_name = channel.name();
        let receivers = self.pool.publish(&channel_name, message).await?;

        tracing::debug!(
            channel = %channel_name,
            receivers = receivers,
            "Published message"
        );

        Ok(receivers)
    }

    /// Publish a room's full typing map
    pub async fn publish_typing_map(&self, room_id: &RoomId, map: &TypingMap) -> RedisResult<u32> {
        let payload = typing_payload(map)?;
        self.publish_raw(&PubSubChannel::typing(room_id.clone()), &payload)
            .await
    }

    /// Publish a participant's presence state
    pub async fn publish_presence(
        &self,
        user_id: &ParticipantId,
        state: &PresenceState,
    ) -> RedisResult<u32> {
        self.publish_raw(&PubSubChannel::presence(user_id.clone()), state.as_str())
            .await
    }
}

fn typing_payload(map: &TypingMap) -> RedisResult<String> {
    Ok(serde_json::to_string(&map.to_value())?)
}
