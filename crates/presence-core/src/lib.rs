//! # presence-core
//!
//! Domain layer for typing and presence coordination: identifiers, presence
//! states, typing maps, and the ports a realtime backend has to provide.
//! This crate has zero dependencies on infrastructure (Redis, runtimes, etc.).

pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::PresenceError;
pub use traits::{
    ChannelResult, IdentityProvider, PresenceCallback, PresenceChannel, StaticIdentity,
    Subscription, TypingCallback,
};
pub use value_objects::{normalize_id, ParticipantId, PresenceState, RoomId, TypingMap};
