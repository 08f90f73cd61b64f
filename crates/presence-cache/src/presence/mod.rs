//! Presence storage module.
//!
//! Tracks participant presence records and per-room typing flags.

mod store;

pub use store::{PresenceRecord, PresenceStore, PresenceStoreConfig};
