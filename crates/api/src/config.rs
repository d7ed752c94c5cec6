//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::CheckoutConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; the in-memory store is
///   used when unset
/// - `CHECKOUT_LOCK_TIMEOUT_MS` — bound on row lock waits (default: `5000`)
/// - `CHECKOUT_MAX_ATTEMPTS` — attempts per checkout including the first
///   (default: `2`)
/// - `CHECKOUT_RETRY_BACKOFF_MS` — pause before a retry (default: `25`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub lock_timeout: Duration,
    pub checkout: CheckoutConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults, as does a zero lock
    /// timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_millis = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());
        let millis = |key: &str, default: Duration| {
            parse_millis(key).map(Duration::from_millis).unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            lock_timeout: parse_millis("CHECKOUT_LOCK_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            checkout: CheckoutConfig {
                max_attempts: lookup("CHECKOUT_MAX_ATTEMPTS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.checkout.max_attempts),
                retry_backoff: millis(
                    "CHECKOUT_RETRY_BACKOFF_MS",
                    defaults.checkout.retry_backoff,
                ),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            lock_timeout: store::memory::DEFAULT_LOCK_TIMEOUT,
            checkout: CheckoutConfig::default(),
        }
    }
}
