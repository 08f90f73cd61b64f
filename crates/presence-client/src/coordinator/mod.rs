//! Participant coordinator
//!
//! One actor task per open conversation. It owns the peer presence and room
//! typing subscriptions, the local typing announcement, and the derived
//! snapshot. Handle calls, subscription callbacks, and the typing idle
//! deadline all funnel into the actor, which handles them one at a time in
//! arrival order.

mod actor;
mod handle;
mod message;


pub use handle::ParticipantCoordinator;
