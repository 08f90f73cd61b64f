//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! one is present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub redis: RedisConfig,
    pub typing: TypingConfig,
    pub presence: PresenceConfig,
    pub subscriber: SubscriberSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Typing indicator timing
#[derive(Debug, Clone, Deserialize)]
pub struct TypingConfig {
    /// Local idle window before an announced typing flag is cleared
    #[serde(default = "default_typing_idle_ms")]
    pub idle_ms: u64,
    /// Server-side expiry for flags in rooms registered for disconnect cleanup
    #[serde(default = "default_typing_ttl_secs")]
    pub ttl_secs: u64,
}

impl TypingConfig {
    #[must_use]
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            idle_ms: default_typing_idle_ms(),
            ttl_secs: default_typing_ttl_secs(),
        }
    }
}

/// Presence record settings
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_presence_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_presence_ttl_secs(),
        }
    }
}

/// Pub/Sub subscriber settings
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberSettings {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "presence-client".to_string()
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_typing_idle_ms() -> u64 {
    4500
}

fn default_typing_ttl_secs() -> u64 {
    10
}

fn default_presence_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a numeric
    /// variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .as_deref()
                    .and_then(Environment::parse)
                    .unwrap_or_default(),
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_or(
                    &lookup,
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections,
                )?,
            },
            typing: TypingConfig {
                idle_ms: parse_or(&lookup, "TYPING_IDLE_MS", default_typing_idle_ms)?,
                ttl_secs: parse_or(&lookup, "TYPING_TTL_SECS", default_typing_ttl_secs)?,
            },
            presence: PresenceConfig {
                ttl_secs: parse_or(&lookup, "PRESENCE_TTL_SECS", default_presence_ttl_secs)?,
            },
            subscriber: SubscriberSettings {
                reconnect_delay_ms: parse_or(
                    &lookup,
                    "SUBSCRIBER_RECONNECT_DELAY_MS",
                    default_reconnect_delay_ms,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
