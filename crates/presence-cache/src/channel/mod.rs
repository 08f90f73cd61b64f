//! Redis-backed presence channel

mod redis_channel;

pub use redis_channel::RedisPresenceChannel;
