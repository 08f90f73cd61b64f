//! Errors raised by presence channels and typing payload parsing

use thiserror::Error;

/// Presence layer errors.
///
/// None of these are fatal to a coordinator: they are logged where they
/// surface and the coordinator keeps running.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Malformed typing map: {0}")]
    MalformedTypingMap(String),

    #[error("Malformed presence payload: {0}")]
    MalformedPresence(String),

    #[error("No authenticated participant for this session")]
    Unauthenticated,

    #[error("Subscription to {target} failed: {reason}")]
    SubscribeFailed { target: String, reason: String },

    #[error("Publish to {target} failed: {reason}")]
    PublishFailed { target: String, reason: String },

    #[error("Presence channel closed")]
    ChannelClosed,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl PresenceError {
    /// Stable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedTypingMap(_) => "MALFORMED_TYPING_MAP",
            Self::MalformedPresence(_) => "MALFORMED_PRESENCE",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::SubscribeFailed { .. } => "SUBSCRIBE_FAILED",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::ChannelClosed => "CHANNEL_CLOSED",
            Self::Backend(_) => "BACKEND_ERROR",
        }
    }

    /// Payload could not be understood
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedTypingMap(_) | Self::MalformedPresence(_))
    }

    /// Failure talking to the backend; may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SubscribeFailed { .. } | Self::PublishFailed { .. } | Self::Backend(_)
        )
    }

    pub fn subscribe_failed(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::SubscribeFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn publish_failed(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::PublishFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PresenceError::Unauthenticated.code(), "UNAUTHENTICATED");
        assert_eq!(
            PresenceError::MalformedTypingMap("x".to_string()).code(),
            "MALFORMED_TYPING_MAP"
        );
    }

    #[test]
    fn test_classification() {
        assert!(PresenceError::MalformedTypingMap("x".to_string()).is_malformed());
        assert!(!PresenceError::ChannelClosed.is_malformed());
        assert!(PresenceError::publish_failed("typing:room-42", "timeout").is_transient());
        assert!(!PresenceError::Unauthenticated.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = PresenceError::publish_failed("typing:room-42", "connection reset");
        assert_eq!(
            err.to_string(),
            "Publish to typing:room-42 failed: connection reset"
        );
    }
}
