//! Derived coordinator state

use presence_core::ParticipantId;

/// What a conversation screen renders from the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    /// The peer's presence stream last reported `"online"`
    pub is_peer_online: bool,
    /// Someone other than the local participant is typing in the room
    pub is_peer_typing: bool,
    /// Every id the room's typing map flags, in map order
    pub typing_users: Vec<String>,
    /// The local participant currently has a typing announcement up
    pub is_typing_announced: bool,
}

impl ParticipantSnapshot {
    pub(crate) fn derive(
        is_peer_online: bool,
        typing_users: &[String],
        current_user_id: Option<&ParticipantId>,
        is_typing_announced: bool,
    ) -> Self {
        let is_peer_typing = typing_users
            .iter()
            .any(|user| current_user_id.map_or(true, |me| me != user.as_str()));

        Self {
            is_peer_online,
            is_peer_typing,
            typing_users: typing_users.to_vec(),
            is_typing_announced,
        }
    }
}
