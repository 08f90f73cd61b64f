//! Local typing announcement state
//!
//! The coordinator publishes `true` once when the local participant starts
//! typing and `false` once when they stop, go idle, or leave the room. The
//! transitions here decide which of those publishes is due; the coordinator
//! performs them.

use std::time::Duration;

use presence_core::RoomId;
use tokio::time::Instant;

/// A typing flag the coordinator has to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingPublish {
    pub room_id: RoomId,
    pub is_typing: bool,
}

impl TypingPublish {
    fn started(room_id: RoomId) -> Self {
        Self {
            room_id,
            is_typing: true,
        }
    }

    fn stopped(room_id: RoomId) -> Self {
        Self {
            room_id,
            is_typing: false,
        }
    }
}

/// Whether the local participant has a typing announcement up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypingState {
    #[default]
    Idle,
    Announced {
        room_id: RoomId,
        /// Announcement is withdrawn at this instant unless renewed
        deadline: Instant,
    },
}

impl TypingState {
    /// A keystroke in `room_id`.
    ///
    /// Only the first keystroke publishes; later ones push the deadline out.
    pub fn announce(
        &mut self,
        room_id: &RoomId,
        now: Instant,
        idle: Duration,
    ) -> Option<TypingPublish> {
        let deadline = now + idle;
        if let Self::Announced {
            room_id: announced,
            deadline: current,
        } = self
        {
            if announced == room_id {
                *current = deadline;
                return None;
            }
        }

        *self = Self::Announced {
            room_id: room_id.clone(),
            deadline,
        };
        Some(TypingPublish::started(room_id.clone()))
    }

    /// Withdraw the announcement, if any
    pub fn retract(&mut self) -> Option<TypingPublish> {
        match std::mem::take(self) {
            Self::Announced { room_id, .. } => Some(TypingPublish::stopped(room_id)),
            Self::Idle => None,
        }
    }

    /// Withdraw the announcement if its deadline has passed
    pub fn expire(&mut self, now: Instant) -> Option<TypingPublish> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.retract(),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Announced { deadline, .. } => Some(*deadline),
            Self::Idle => None,
        }
    }

    pub fn is_announced(&self) -> bool {
        matches!(self, Self::Announced { .. })
    }
}
