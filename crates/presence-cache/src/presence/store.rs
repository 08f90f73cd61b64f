//! Presence and typing storage in Redis.
//!
//! Each room keeps its typing flags in one hash, `typing:{room}`, with one
//! field per participant. A field's value is the unix-millisecond deadline
//! after which the flag counts as gone, or `0` for a flag that never
//! expires. A `false` flag is a missing field.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::pool::{RedisPool, RedisResult};
use presence_core::{ParticipantId, PresenceState, RoomId, TypingMap};
use serde::{Deserialize, Serialize};

/// Key prefix for participant presence
const PRESENCE_PREFIX: &str = "presence:";
/// Key prefix for typing flags
const TYPING_PREFIX: &str = "typing:";
/// Deadline stored for flags that never expire
const NO_DEADLINE: i64 = 0;

/// Rewrite a flag's deadline only while the flag is still set
static REFRESH_TYPING: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
  redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
  return 1
end
return 0
",
    )
});

/// Remove every flag whose deadline has passed, returning how many went
static SWEEP_TYPING: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r"
local removed = 0
local entries = redis.call('HGETALL', KEYS[1])
for i = 1, #entries, 2 do
  local deadline = tonumber(entries[i + 1])
  if deadline and deadline > 0 and deadline <= tonumber(ARGV[1]) then
    removed = removed + redis.call('HDEL', KEYS[1], entries[i])
  end
end
return removed
",
    )
});

/// Expiry settings for stored records
#[derive(Debug, Clone, Copy)]
pub struct PresenceStoreConfig {
    /// Typing flag lifetime for rooms registered for disconnect cleanup.
    /// The owning session refreshes it while the flag stays set.
    pub typing_ttl_secs: u64,
    /// Presence record TTL (refreshed by each update)
    pub presence_ttl_secs: u64,
}

impl Default for PresenceStoreConfig {
    fn default() -> Self {
        Self {
            typing_ttl_secs: 10,
            presence_ttl_secs: 300,
        }
    }
}

impl PresenceStoreConfig {
    /// Deadline for an expiring typing flag written at `now_ms`
    #[must_use]
    pub fn typing_deadline(&self, now_ms: i64) -> i64 {
        let ttl_ms = i64::try_from(self.typing_ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        now_ms.saturating_add(ttl_ms)
    }
}

impl From<&presence_common::AppConfig> for PresenceStoreConfig {
    fn from(config: &presence_common::AppConfig) -> Self {
        Self {
            typing_ttl_secs: config.typing.ttl_secs,
            presence_ttl_secs: config.presence.ttl_secs,
        }
    }
}

/// Stored presence of one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: ParticipantId,
    pub state: PresenceState,
    /// Last update timestamp (unix seconds)
    pub updated_at: i64,
}

impl PresenceRecord {
    #[must_use]
    pub fn new(user_id: ParticipantId, state: PresenceState) -> Self {
        Self {
            user_id,
            state,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Presence and typing store
#[derive(Clone, Debug)]
pub struct PresenceStore {
    pool: RedisPool,
    config: PresenceStoreConfig,
}

impl PresenceStore {
    #[must_use]
    pub fn new(pool: RedisPool, config: PresenceStoreConfig) -> Self {
        Self { pool, config }
    }

    #[must_use]
    pub fn config(&self) -> PresenceStoreConfig {
        self.config
    }

    fn presence_key(user_id: &ParticipantId) -> String {
        format!("{PRESENCE_PREFIX}{user_id}")
    }

    fn typing_key(room_id: &RoomId) -> String {
        format!("{TYPING_PREFIX}{room_id}")
    }

    /// Store a participant's presence state
    pub async fn set_presence(&self, record: &PresenceRecord) -> RedisResult<()> {
        let key = Self::presence_key(&record.user_id);
        self.pool
            .set(&key, record, Some(self.config.presence_ttl_secs))
            .await?;

        tracing::debug!(
            user_id = %record.user_id,
            state = %record.state,
            "Set presence"
        );

        Ok(())
    }

    pub async fn get_presence(&self, user_id: &ParticipantId) -> RedisResult<Option<PresenceRecord>> {
        self.pool.get_value(&Self::presence_key(user_id)).await
    }

    /// Current state of a participant; a missing record means offline
    pub async fn current_state(&self, user_id: &ParticipantId) -> RedisResult<PresenceState> {
        Ok(self
            .get_presence(user_id)
            .await?
            .map(|record| record.state)
            .unwrap_or_default())
    }

    pub async fn remove_presence(&self, user_id: &ParticipantId) -> RedisResult<bool> {
        self.pool.delete(&Self::presence_key(user_id)).await
    }

    /// Write or clear a typing flag.
    ///
    /// `expires` gives a `true` flag the configured lifetime.
    pub async fn set_typing(
        &self,
        room_id: &RoomId,
        user_id: &ParticipantId,
        is_typing: bool,
        expires: bool,
    ) -> RedisResult<()> {
        let key = Self::typing_key(room_id);

        if is_typing {
            let deadline = if expires {
                self.config.typing_deadline(now_ms())
            } else {
                NO_DEADLINE
            };
            self.pool
                .hset(&key, user_id.as_str(), &deadline.to_string())
                .await?;
        } else {
            self.pool.hdel(&key, user_id.as_str()).await?;
        }

        tracing::trace!(
            room_id = %room_id,
            user_id = %user_id,
            is_typing,
            expires,
            "Set typing flag"
        );

        Ok(())
    }

    /// Push an expiring flag's deadline forward.
    ///
    /// Returns `false` when the flag is no longer set, so a refresh racing a
    /// clear never resurrects it.
    pub async fn refresh_typing(&self, room_id: &RoomId, user_id: &ParticipantId) -> RedisResult<bool> {
        let mut conn = self.pool.get().await?;
        let refreshed: i32 = REFRESH_TYPING
            .key(Self::typing_key(room_id))
            .arg(user_id.as_str())
            .arg(self.config.typing_deadline(now_ms()))
            .invoke_async(&mut conn)
            .await?;
        Ok(refreshed > 0)
    }

    /// Delete the room's expired flags, returning how many were removed
    pub async fn sweep_expired_typing(&self, room_id: &RoomId) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let removed: u32 = SWEEP_TYPING
            .key(Self::typing_key(room_id))
            .arg(now_ms())
            .invoke_async(&mut conn)
            .await?;

        if removed > 0 {
            tracing::debug!(room_id = %room_id, removed, "Swept expired typing flags");
        }
        Ok(removed)
    }

    /// Collect every live typing flag in a room
    pub async fn room_typing(&self, room_id: &RoomId) -> RedisResult<TypingMap> {
        let entries = self.pool.hgetall(&Self::typing_key(room_id)).await?;
        Ok(live_flags(&entries, now_ms()))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Typing map from a room hash, skipping flags whose deadline has passed
fn live_flags(entries: &HashMap<String, String>, now_ms: i64) -> TypingMap {
    let mut map = TypingMap::new();
    for (field, deadline) in entries {
        let Some(user_id) = ParticipantId::parse(field) else {
            continue;
        };
        match deadline.parse::<i64>() {
            Ok(NO_DEADLINE) => map.set(&user_id, true),
            Ok(deadline) if deadline > now_ms => map.set(&user_id, true),
            Ok(_) => {}
            Err(_) => tracing::warn!(field = %field, value = %deadline, "Unreadable typing deadline"),
        }
    }
    map
}
