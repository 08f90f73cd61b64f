//! In-process presence hub
//!
//! Lets several coordinators share one realtime channel without a server:
//! local development and tests.

mod hub;

pub use hub::{HubEvent, LocalPresenceHub, LocalPresenceSession};
