//! Application error types
//!
//! Errors that reach the edge of a process (the probe binary, startup code).
//! Inside a running coordinator nothing is fatal and errors are only logged.

use presence_core::PresenceError;
use std::fmt;

use crate::config::ConfigError;
use crate::telemetry::TracingError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TracingError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Presence(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the failed operation could help
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Cache(_) => true,
            Self::Presence(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Create a cache error from any displayable failure
    #[must_use]
    pub fn cache(err: impl fmt::Display) -> Self {
        Self::Cache(err.to_string())
    }

    #[must_use]
    pub fn invalid_input(msg: impl fmt::Display) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::from(ConfigError::MissingVar("REDIS_URL")).error_code(),
            "CONFIG_ERROR"
        );
        assert_eq!(AppError::cache("timeout").error_code(), "CACHE_ERROR");
        assert_eq!(
            AppError::from(PresenceError::Unauthenticated).error_code(),
            "UNAUTHENTICATED"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(AppError::cache("connection refused").is_transient());
        assert!(AppError::from(PresenceError::Backend("down".to_string())).is_transient());
        assert!(!AppError::invalid_input("blank room").is_transient());
    }

    #[test]
    fn test_display() {
        let err = AppError::from(ConfigError::MissingVar("REDIS_URL"));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: REDIS_URL"
        );

        let err = AppError::from(PresenceError::ChannelClosed);
        assert_eq!(err.to_string(), "Presence channel closed");
    }
}
