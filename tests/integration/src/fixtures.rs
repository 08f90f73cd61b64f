//! Test fixtures and data generators
//!
//! Provides reusable identifiers for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use presence_core::{ParticipantId, RoomId};

/// The local participant in most scenarios
pub const USER_ID: &str = "user-1";

/// The advisor on the other side of the conversation
pub const AGENT_ID: &str = "agent-7";

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A room id no other test in this process uses
pub fn unique_room() -> RoomId {
    room(&format!("room-{}", unique_suffix()))
}

/// A room id no other test run uses, for shared backends
pub fn unique_remote_room() -> RoomId {
    room(&format!("room-{}", uuid::Uuid::new_v4()))
}

pub fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).unwrap_or_else(|| panic!("invalid room id {raw:?}"))
}

pub fn participant(raw: &str) -> ParticipantId {
    ParticipantId::parse(raw).unwrap_or_else(|| panic!("invalid participant id {raw:?}"))
}
