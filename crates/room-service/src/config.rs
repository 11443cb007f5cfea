//! Room Service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default room lifetime in seconds (10 minutes).
pub const DEFAULT_ROOM_TTL_SECONDS: u64 = 600;

/// Default in-memory expiry reaper period in seconds.
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 30;

/// Default per-room broadcast buffer (events a slow subscriber may lag by).
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 64;

/// Default SSE keep-alive period in seconds.
pub const DEFAULT_SSE_KEEPALIVE_SECONDS: u64 = 15;

/// Default request timeout in seconds (non-streaming routes).
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Minimum length of the session cookie signing secret, in bytes.
pub const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Which store adapter backs room state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Redis with native key TTLs.
    Redis,
    /// Process-local store with a background expiry reaper.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "ROOM_STORE must be 'redis' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Room Service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// HTTP server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Store backend (default: redis).
    pub store_backend: StoreBackend,

    /// Redis connection URL, required for the redis backend.
    /// Protected by `SecretString` to prevent accidental logging.
    pub redis_url: Option<SecretString>,

    /// HMAC key for the session-binding cookie.
    pub session_secret: SecretString,

    /// Whether the session cookie carries the `Secure` attribute (default: true).
    pub session_cookie_secure: bool,

    /// Lifetime of newly created rooms in seconds (default: 600).
    pub room_ttl_seconds: u64,

    /// In-memory store reaper period in seconds (default: 30).
    pub reaper_interval_seconds: u64,

    /// Per-room broadcast buffer capacity (default: 64).
    pub event_buffer_capacity: usize,

    /// SSE keep-alive period in seconds (default: 15).
    pub sse_keepalive_seconds: u64,

    /// Request timeout for non-streaming routes in seconds (default: 30).
    pub request_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("store_backend", &self.store_backend)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_secret", &"[REDACTED]")
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("room_ttl_seconds", &self.room_ttl_seconds)
            .field("reaper_interval_seconds", &self.reaper_interval_seconds)
            .field("event_buffer_capacity", &self.event_buffer_capacity)
            .field("sse_keepalive_seconds", &self.sse_keepalive_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store_backend = match vars.get("ROOM_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Redis,
        };

        let redis_url = vars.get("REDIS_URL").cloned().map(SecretString::from);
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string()));
        }

        let session_secret = vars
            .get("SESSION_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("SESSION_SECRET".to_string()))?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            // Do not echo the secret in the error
            return Err(ConfigError::InvalidValue(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_BYTES} bytes"
            )));
        }
        let session_secret = SecretString::from(session_secret.clone());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let session_cookie_secure = vars
            .get("SESSION_COOKIE_SECURE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let room_ttl_seconds = vars
            .get("ROOM_TTL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ROOM_TTL_SECONDS);
        if room_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "ROOM_TTL_SECONDS must be greater than zero".to_string(),
            ));
        }

        let reaper_interval_seconds = vars
            .get("REAPER_INTERVAL_SECONDS")
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REAPER_INTERVAL_SECONDS);

        let event_buffer_capacity = vars
            .get("EVENT_BUFFER_CAPACITY")
            .and_then(|s| s.parse().ok())
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER_CAPACITY);

        let sse_keepalive_seconds = vars
            .get("SSE_KEEPALIVE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SSE_KEEPALIVE_SECONDS);

        let request_timeout_seconds = vars
            .get("REQUEST_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);

        Ok(Config {
            bind_address,
            store_backend,
            redis_url,
            session_secret,
            session_cookie_secure,
            room_ttl_seconds,
            reaper_interval_seconds,
            event_buffer_capacity,
            sse_keepalive_seconds,
            request_timeout_seconds,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const TEST_SECRET: &str = "test-session-secret-0123456789abcdef";

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "REDIS_URL".to_string(),
                "redis://:hunter2@localhost:6379".to_string(),
            ),
            ("SESSION_SECRET".to_string(), TEST_SECRET.to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(
            config.redis_url.as_ref().unwrap().expose_secret(),
            "redis://:hunter2@localhost:6379"
        );
        assert!(config.session_cookie_secure);
        assert_eq!(config.room_ttl_seconds, DEFAULT_ROOM_TTL_SECONDS);
        assert_eq!(
            config.reaper_interval_seconds,
            DEFAULT_REAPER_INTERVAL_SECONDS
        );
        assert_eq!(config.event_buffer_capacity, DEFAULT_EVENT_BUFFER_CAPACITY);
        assert_eq!(config.sse_keepalive_seconds, DEFAULT_SSE_KEEPALIVE_SECONDS);
        assert_eq!(
            config.request_timeout_seconds,
            DEFAULT_REQUEST_TIMEOUT_SECONDS
        );
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("SESSION_COOKIE_SECURE".to_string(), "false".to_string());
        vars.insert("ROOM_TTL_SECONDS".to_string(), "60".to_string());
        vars.insert("REAPER_INTERVAL_SECONDS".to_string(), "5".to_string());
        vars.insert("EVENT_BUFFER_CAPACITY".to_string(), "8".to_string());
        vars.insert("SSE_KEEPALIVE_SECONDS".to_string(), "3".to_string());
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert!(!config.session_cookie_secure);
        assert_eq!(config.room_ttl_seconds, 60);
        assert_eq!(config.reaper_interval_seconds, 5);
        assert_eq!(config.event_buffer_capacity, 8);
        assert_eq!(config.sse_keepalive_seconds, 3);
        assert_eq!(config.request_timeout_seconds, 10);
    }

    #[test]
    fn test_memory_backend_does_not_need_redis_url() {
        let mut vars = base_vars();
        vars.remove("REDIS_URL");
        vars.insert("ROOM_STORE".to_string(), "memory".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_from_vars_missing_redis_url() {
        let mut vars = base_vars();
        vars.remove("REDIS_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_from_vars_missing_session_secret() {
        let mut vars = base_vars();
        vars.remove("SESSION_SECRET");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "SESSION_SECRET"));
    }

    #[test]
    fn test_short_session_secret_rejected() {
        let mut vars = base_vars();
        vars.insert("SESSION_SECRET".to_string(), "too-short".to_string());

        let result = Config::from_vars(&vars);
        match result {
            Err(ConfigError::InvalidValue(msg)) => assert!(!msg.contains("too-short")),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_room_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("ROOM_TTL_SECONDS".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_unknown_store_backend_rejected() {
        let mut vars = base_vars();
        vars.insert("ROOM_STORE".to_string(), "etcd".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("redis://"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains(TEST_SECRET));
    }
}
