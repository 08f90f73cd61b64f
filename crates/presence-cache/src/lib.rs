//! # presence-cache
//!
//! Realtime backends for the participant coordinator.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Presence Store**: Participant presence records and expiring typing flags
//! - **Pub/Sub**: Room typing maps and presence states fanned out across clients
//! - **Channels**: `PresenceChannel` over Redis, plus an in-process hub
//!
//! ## Example
//!
//! ```ignore
//! use presence_cache::{LocalPresenceHub, RedisPresenceChannel};
//!
//! // Everything in one process
//! let hub = LocalPresenceHub::new();
//! let session = hub.session_for("user-1");
//!
//! // Or shared through Redis
//! let config = AppConfig::from_env()?;
//! let channel = RedisPresenceChannel::from_config(&config, Arc::new(StaticIdentity::parse("user-1")))?;
//! channel.announce_presence(PresenceState::Online).await?;
//! ```

pub mod channel;
pub mod local;
pub mod pool;
pub mod presence;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export presence types
pub use presence::{PresenceRecord, PresenceStore, PresenceStoreConfig};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig,
    SubscriberError, SubscriberResult, PRESENCE_CHANNEL_PREFIX, TYPING_CHANNEL_PREFIX,
};

// Re-export channel backends
pub use channel::RedisPresenceChannel;
pub use local::{HubEvent, LocalPresenceHub, LocalPresenceSession};
