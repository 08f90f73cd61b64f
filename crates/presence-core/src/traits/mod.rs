//! Ports - what the coordinator needs from the outside world

mod channel;
mod subscription;

pub use channel::{
    ChannelResult, IdentityProvider, PresenceCallback, PresenceChannel, StaticIdentity,
    TypingCallback,
};
pub use subscription::Subscription;
