//! # presence-client
//!
//! Participant coordinator for an open conversation: is the peer online, is
//! the peer typing, and a debounced "I am typing" announcement driven by
//! keystrokes.
//!
//! ## Example
//!
//! ```ignore
//! use presence_cache::LocalPresenceHub;
//! use presence_client::{ParticipantCoordinator, ParticipantOptions};
//!
//! let hub = LocalPresenceHub::new();
//! let session = Arc::new(hub.session_for("user-1"));
//!
//! let options = ParticipantOptions::new(Some("room-42"), Some("agent-7"))
//!     .with_identity_fallback(session.as_ref());
//! let coordinator = ParticipantCoordinator::spawn(session, options);
//!
//! // On every change of the text field
//! coordinator.announce_typing(!text.is_empty());
//!
//! if coordinator.is_peer_typing() {
//!     // render the indicator
//! }
//!
//! coordinator.shutdown().await;
//! ```

pub mod coordinator;
pub mod options;
pub mod snapshot;
pub mod state;

pub use coordinator::ParticipantCoordinator;
pub use options::{ParticipantOptions, DEFAULT_TYPING_IDLE};
pub use snapshot::ParticipantSnapshot;
pub use state::{TypingPublish, TypingState};
