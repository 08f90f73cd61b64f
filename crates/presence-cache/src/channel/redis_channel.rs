//! `PresenceChannel` over Redis keys and pub/sub.
//!
//! Writes go to the [`PresenceStore`] and are followed by a publish of the
//! new room map or presence state. Each subscription owns a forwarding task
//! that filters the shared [`Subscriber`] broadcast down to one channel.
//!
//! Expiring typing flags are kept alive by the session that set them, and
//! every typing subscription sweeps its room for flags that outlived their
//! owner, republishing the map when it removes any.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use presence_core::{
    ChannelResult, IdentityProvider, ParticipantId, PresenceCallback, PresenceChannel,
    PresenceError, PresenceState, RoomId, Subscription, TypingCallback,
};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::instrument;

use crate::pool::{RedisPool, RedisResult};
use crate::presence::{PresenceRecord, PresenceStore, PresenceStoreConfig};
use crate::pubsub::{PubSubChannel, Publisher, ReceivedMessage, Subscriber, SubscriberConfig};

/// Shortest keepalive or sweep period, whatever the TTL
const MIN_PERIOD: Duration = Duration::from_millis(250);

/// Presence channel session bound to one identity
pub struct RedisPresenceChannel {
    store: PresenceStore,
    publisher: Publisher,
    subscriber: Arc<Subscriber>,
    identity: Arc<dyn IdentityProvider>,
    /// Rooms whose typing flags are written with an expiry
    disconnect_rooms: DashSet<RoomId>,
    /// Deadline refresh tasks for this session's own expiring flags
    keepalives: DashMap<RoomId, JoinHandle<()>>,
}

impl RedisPresenceChannel {
    pub fn new(
        pool: RedisPool,
        subscriber: Arc<Subscriber>,
        identity: Arc<dyn IdentityProvider>,
        config: PresenceStoreConfig,
    ) -> Self {
        Self {
            store: PresenceStore::new(pool.clone(), config),
            publisher: Publisher::new(pool),
            subscriber,
            identity,
            disconnect_rooms: DashSet::new(),
            keepalives: DashMap::new(),
        }
    }

    /// Build pool, subscriber and channel from application config
    pub fn from_config(
        config: &presence_common::AppConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> RedisResult<Self> {
        let pool = RedisPool::from_config(&config.redis)?;
        let subscriber = Arc::new(Subscriber::new(SubscriberConfig::from(config)));
        Ok(Self::new(
            pool,
            subscriber,
            identity,
            PresenceStoreConfig::from(config),
        ))
    }

    fn session_user(&self) -> ChannelResult<ParticipantId> {
        self.identity
            .current_user_id()
            .ok_or(PresenceError::Unauthenticated)
    }

    /// Publish this session's own presence state
    #[instrument(skip(self))]
    pub async fn announce_presence(&self, state: PresenceState) -> ChannelResult<()> {
        let user_id = self.session_user()?;
        let record = PresenceRecord::new(user_id.clone(), state);
        self.store.set_presence(&record).await?;
        self.publisher
            .publish_presence(&user_id, &record.state)
            .await?;
        Ok(())
    }

    /// Mark this session offline and clear its typing flags in every room it
    /// registered for disconnect cleanup
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> ChannelResult<()> {
        let user_id = self.session_user()?;
        self.stop_all_keepalives();
        let rooms: Vec<RoomId> = self
            .disconnect_rooms
            .iter()
            .map(|room| room.key().clone())
            .collect();

        for room_id in &rooms {
            self.write_typing(room_id, &user_id, false).await?;
        }

        self.store.remove_presence(&user_id).await?;
        self.publisher
            .publish_presence(&user_id, &PresenceState::Offline)
            .await?;
        Ok(())
    }

    async fn write_typing(
        &self,
        room_id: &RoomId,
        user_id: &ParticipantId,
        is_typing: bool,
    ) -> ChannelResult<()> {
        let expires = self.disconnect_rooms.contains(room_id);
        if !is_typing {
            self.stop_keepalive(room_id);
        }
        self.store
            .set_typing(room_id, user_id, is_typing, expires)
            .await?;
        if is_typing && expires {
            self.start_keepalive(room_id, user_id);
        }

        let map = self.store.room_typing(room_id).await?;
        self.publisher.publish_typing_map(room_id, &map).await?;
        Ok(())
    }

    /// Keep this session's flag in `room_id` alive until it is cleared
    fn start_keepalive(&self, room_id: &RoomId, user_id: &ParticipantId) {
        if self
            .keepalives
            .get(room_id)
            .is_some_and(|task| !task.is_finished())
        {
            return;
        }

        let period = keepalive_period(self.store.config().typing_ttl_secs);
        let task = tokio::spawn(keep_typing_alive(
            self.store.clone(),
            room_id.clone(),
            user_id.clone(),
            period,
        ));
        if let Some(previous) = self.keepalives.insert(room_id.clone(), task) {
            previous.abort();
        }
    }

    fn stop_keepalive(&self, room_id: &RoomId) {
        if let Some((_, task)) = self.keepalives.remove(room_id) {
            task.abort();
        }
    }

    fn stop_all_keepalives(&self) {
        self.keepalives.retain(|_, task| {
            task.abort();
            false
        });
    }

    /// Register interest in `channel` and forward its messages to `deliver`.
    ///
    /// `companion` is aborted together with the forwarding task.
    async fn forward<F>(
        &self,
        channel: PubSubChannel,
        deliver: F,
        companion: Option<JoinHandle<()>>,
    ) -> ChannelResult<Subscription>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        // Take the receiver first so nothing published after SUBSCRIBE is lost
        let receiver = self.subscriber.receiver();
        if let Err(e) = self.subscriber.acquire(&channel).await {
            if let Some(companion) = companion {
                companion.abort();
            }
            return Err(PresenceError::subscribe_failed(channel.name(), e));
        }

        let name = channel.name();
        let task = tokio::spawn(forward_loop(receiver, name.clone(), deliver));
        let subscriber = self.subscriber.clone();

        Ok(Subscription::new(name, move || {
            task.abort();
            if let Some(companion) = companion {
                companion.abort();
            }
            subscriber.release(&channel);
        }))
    }
}

impl Drop for RedisPresenceChannel {
    fn drop(&mut self) {
        self.stop_all_keepalives();
    }
}

fn keepalive_period(ttl_secs: u64) -> Duration {
    (Duration::from_secs(ttl_secs) / 2).max(MIN_PERIOD)
}

fn sweep_period(ttl_secs: u64) -> Duration {
    Duration::from_secs(ttl_secs).max(MIN_PERIOD)
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn keep_typing_alive(
    store: PresenceStore,
    room_id: RoomId,
    user_id: ParticipantId,
    period: Duration,
) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match store.refresh_typing(&room_id, &user_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(room_id = %room_id, user_id = %user_id, "Typing flag gone, keepalive stopped");
                break;
            }
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Failed to refresh typing flag");
            }
        }
    }
}

async fn sweep_room(store: PresenceStore, publisher: Publisher, room_id: RoomId, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match store.sweep_expired_typing(&room_id).await {
            Ok(0) => {}
            Ok(_) => {
                let published = match store.room_typing(&room_id).await {
                    Ok(map) => publisher.publish_typing_map(&room_id, &map).await.map(drop),
                    Err(e) => Err(e),
                };
                if let Err(e) = published {
                    tracing::warn!(room_id = %room_id, error = %e, "Failed to republish swept typing map");
                }
            }
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Failed to sweep typing flags");
            }
        }
    }
}

async fn forward_loop<F>(mut receiver: broadcast::Receiver<ReceivedMessage>, name: String, deliver: F)
where
    F: Fn(String) + Send + Sync + 'static,
{
    loop {
        match receiver.recv().await {
            Ok(message) if message.channel_name == name => deliver(message.payload),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(channel = %name, skipped, "Subscription lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Typing payloads that are not JSON are handed on as a string so the
/// consumer's parser reports them as malformed
fn typing_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[async_trait]
impl PresenceChannel for RedisPresenceChannel {
    #[instrument(skip(self, callback))]
    async fn subscribe_to_user_presence(
        &self,
        user_id: &ParticipantId,
        callback: PresenceCallback,
    ) -> ChannelResult<Subscription> {
        let deliver = callback.clone();
        let subscription = self
            .forward(
                PubSubChannel::presence(user_id.clone()),
                move |payload| deliver(payload),
                None,
            )
            .await?;

        match self.store.current_state(user_id).await {
            Ok(state) => callback(state.to_string()),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Failed to read current presence"),
        }

        Ok(subscription)
    }

    #[instrument(skip(self, callback))]
    async fn subscribe_to_typing(
        &self,
        room_id: &RoomId,
        callback: TypingCallback,
    ) -> ChannelResult<Subscription> {
        let deliver = callback.clone();
        let sweeper = tokio::spawn(sweep_room(
            self.store.clone(),
            self.publisher.clone(),
            room_id.clone(),
            sweep_period(self.store.config().typing_ttl_secs),
        ));
        let subscription = self
            .forward(
                PubSubChannel::typing(room_id.clone()),
                move |payload| deliver(typing_payload(&payload)),
                Some(sweeper),
            )
            .await?;

        match self.store.room_typing(room_id).await {
            Ok(map) => callback(map.to_value()),
            Err(e) => tracing::warn!(room_id = %room_id, error = %e, "Failed to read current typing map"),
        }

        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn set_typing(&self, room_id: &RoomId, is_typing: bool) -> ChannelResult<()> {
        let user_id = self.session_user()?;
        self.write_typing(room_id, &user_id, is_typing).await
    }

    #[instrument(skip(self))]
    async fn register_typing_on_disconnect(&self, room_id: &RoomId) -> ChannelResult<()> {
        if self.disconnect_rooms.insert(room_id.clone()) {
            tracing::debug!(
                room_id = %room_id,
                ttl_secs = self.store.config().typing_ttl_secs,
                "Typing flags in room will expire server-side"
            );
        }
        Ok(())
    }
}
