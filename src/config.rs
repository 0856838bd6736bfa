//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Gate Configuration
//!
//! - `ACCESS_KEY`: Query parameter name whose presence grants access (unset = gate disabled)
//! - `ACCESS_KEY_WHITELIST`: Comma-separated exact IPs and/or CIDR ranges
//! - `ACCESS_KEY_FAIL_ACTION`: `message`, `redirect`, or anything else for pass-through
//! - `ACCESS_KEY_MESSAGE`: Body of the 401 response
//! - `ACCESS_KEY_REDIRECT_URL`: Redirect target (empty = `SITE_ROOT_URL`)
//! - `ACCESS_KEY_WHITELIST_MESSAGE`: Notice for whitelisted visitors without the key
//!
//! # Host Configuration
//!
//! - `ADMIN_PATH_PREFIX`: Path prefix of the gated area (default: `/administrator`)
//! - `SITE_ROOT_URL`: Public site root (default: `/`)
//! - `SESSION_COOKIE_NAME`: Cookie carrying the session id (default: `accesskey_session`)
//! - `SESSION_TTL_SECS`: Lifetime of an in-memory authorized flag (default: 86400)
//! - `SESSION_MAX_ENTRIES`: Sessions kept by the in-memory store (default: 10000)

use std::env;
use std::time::Duration;

use crate::error::{GateError, GateResult};
use crate::gate::{
    Allowlist, DEFAULT_FAIL_MESSAGE, DEFAULT_WHITELIST_MESSAGE, FailAction, GateConfig,
};
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// let gate = config.gate_config();
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Gate Configuration
    // =========================================================================
    /// Name of the query parameter that unlocks the admin area
    pub access_key: Option<String>,

    /// Raw whitelist entries, trimmed, empties dropped
    pub whitelist: Vec<String>,

    pub fail_action: FailAction,

    /// 401 body (default: "Unauthorized access")
    pub fail_message: String,

    /// Redirect target for the `redirect` fail action
    pub redirect_url: Option<String>,

    pub whitelist_message: String,

    // =========================================================================
    // Host Configuration
    // =========================================================================
    /// Path prefix identifying the admin surface
    pub admin_path_prefix: String,

    /// Public site root, used as the redirect fallback
    pub site_root_url: String,

    /// Session cookie name
    pub session_cookie_name: String,

    /// Lifetime of a flag in the in-memory store (default: 24h)
    pub session_ttl: Duration,

    /// Capacity of the in-memory store (default: 10000)
    pub session_max_entries: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `GateError::ConfigError` if any value is invalid
    /// (e.g., non-numeric PORT value, admin prefix without a leading `/`).
    pub fn from_env() -> GateResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Gate
            access_key: Self::optional_env("ACCESS_KEY"),
            whitelist: Self::parse_list(&env::var("ACCESS_KEY_WHITELIST").unwrap_or_default()),
            fail_action: env::var("ACCESS_KEY_FAIL_ACTION")
                .map(|v| FailAction::from_option(&v))
                .unwrap_or_default(),
            fail_message: Self::optional_env("ACCESS_KEY_MESSAGE")
                .unwrap_or_else(|| DEFAULT_FAIL_MESSAGE.to_string()),
            redirect_url: Self::optional_env("ACCESS_KEY_REDIRECT_URL"),
            whitelist_message: Self::optional_env("ACCESS_KEY_WHITELIST_MESSAGE")
                .unwrap_or_else(|| DEFAULT_WHITELIST_MESSAGE.to_string()),

            // Host
            admin_path_prefix: env::var("ADMIN_PATH_PREFIX")
                .unwrap_or_else(|_| "/administrator".to_string()),
            site_root_url: Self::optional_env("SITE_ROOT_URL").unwrap_or_else(|| "/".to_string()),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "accesskey_session".to_string()),
            session_ttl: Duration::from_secs(Self::parse_env(
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL.as_secs(),
            )?),
            session_max_entries: Self::parse_env("SESSION_MAX_ENTRIES", DEFAULT_MAX_SESSIONS)?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `GateError::ConfigError` if validation fails.
    fn validate(&self) -> GateResult<()> {
        if !self.admin_path_prefix.starts_with('/') {
            return Err(GateError::ConfigError(format!(
                "ADMIN_PATH_PREFIX must start with '/' (got {:?})",
                self.admin_path_prefix
            )));
        }

        if self.admin_path_prefix == "/" {
            return Err(GateError::ConfigError(
                "ADMIN_PATH_PREFIX must not be the site root".to_string(),
            ));
        }

        if self.session_cookie_name.is_empty()
            || !self.session_cookie_name.bytes().all(is_cookie_token_byte)
        {
            return Err(GateError::ConfigError(format!(
                "SESSION_COOKIE_NAME must be a non-empty cookie token (got {:?})",
                self.session_cookie_name
            )));
        }

        if self.session_ttl.is_zero() {
            return Err(GateError::ConfigError(
                "SESSION_TTL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.session_max_entries == 0 {
            return Err(GateError::ConfigError(
                "SESSION_MAX_ENTRIES must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the gate is enabled (a key is configured).
    pub fn gate_enabled(&self) -> bool {
        self.access_key.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Derive the immutable gate configuration.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            key_param: self.access_key.clone(),
            allowlist: Allowlist::new(&self.whitelist),
            fail_action: self.fail_action,
            fail_message: self.fail_message.clone(),
            redirect_url: self.redirect_url.clone(),
            whitelist_message: self.whitelist_message.clone(),
            site_root: self.site_root_url.clone(),
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> GateResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| GateError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Read an environment variable, treating empty as unset.
    fn optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Split a comma-separated list, trimming entries and dropping empties.
    fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// RFC 6265 cookie-name token characters.
fn is_cookie_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Gate
            access_key: None,
            whitelist: vec![],
            fail_action: FailAction::Message,
            fail_message: DEFAULT_FAIL_MESSAGE.to_string(),
            redirect_url: None,
            whitelist_message: DEFAULT_WHITELIST_MESSAGE.to_string(),
            // Host
            admin_path_prefix: "/administrator".to_string(),
            site_root_url: "/".to_string(),
            session_cookie_name: "accesskey_session".to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            session_max_entries: DEFAULT_MAX_SESSIONS,
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
