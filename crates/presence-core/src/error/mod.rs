//! Domain errors

mod presence_error;

pub use presence_error::PresenceError;
