//! Actor inbox messages

use serde_json::Value;
use tokio::sync::oneshot;

use crate::options::ParticipantOptions;

#[derive(Debug)]
pub(crate) enum Message {
    /// New inputs from the screen
    Update(ParticipantOptions),
    AnnounceTyping(bool),
    ForceResetTyping,
    /// Answered once nothing sent before it is left in the inbox
    Settle(oneshot::Sender<()>),
    Shutdown(Option<oneshot::Sender<()>>),
    /// Raw presence state from the peer subscription opened as `generation`
    PeerPresence { generation: u64, state: String },
    /// Raw typing map from the room subscription opened as `generation`
    RoomTyping { generation: u64, payload: Value },
}
