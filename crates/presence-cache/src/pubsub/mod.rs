//! Redis Pub/Sub module.
//!
//! Carries typing maps and presence states between clients.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, PRESENCE_CHANNEL_PREFIX, TYPING_CHANNEL_PREFIX};
pub use publisher::Publisher;
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
