//! Value objects - immutable types that represent presence concepts

mod ids;
mod presence_state;
mod typing_map;

pub use ids::{normalize_id, ParticipantId, RoomId};
pub use presence_state::PresenceState;
pub use typing_map::TypingMap;
