// Configuration File Support
//
// TOML configuration with environment variable overrides. Every binding the
// process needs is declared here as a typed field and validated once at
// startup; handlers never read ambient environment state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::quota::key::{Resource, DAILY_WINDOW_SECS};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Quota window configuration
    pub quota: QuotaConfig,

    /// Guest identity cookie configuration
    pub guest: GuestConfig,

    /// Static session tokens (token -> account), standing in for the
    /// external auth provider
    pub sessions: HashMap<String, SessionEntry>,

    /// Upstream provider URLs keyed by tool slug
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,

    /// Listen port
    pub port: u16,

    /// Mark guest cookies `Secure` (set when serving over HTTPS)
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            secure_cookies: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Quota window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaConfig {
    /// Rolling window length in seconds
    pub window_secs: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            window_secs: DAILY_WINDOW_SECS,
        }
    }
}

/// Guest identity cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuestConfig {
    /// Cookie name
    pub cookie_name: String,

    /// Cookie lifetime in days
    pub cookie_max_age_days: u32,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            cookie_name: "guest_id".to_string(),
            cookie_max_age_days: 180,
        }
    }
}

/// One configured session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    /// Account the token belongs to
    pub user_id: String,

    /// Recorded plan, if any
    #[serde(default)]
    pub plan: Option<crate::quota::entitlement::Plan>,
}

/// Upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider URL per tool slug (e.g. "image-enhancer" = "https://...").
    /// A tool with no URL is a disabled feature.
    pub urls: HashMap<String, String>,
}

impl Config {
    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation. A missing file yields the default configuration.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            let config = Self::default().apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))?;

        let config = config.apply_env_overrides();
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - TOOLGATE_LOG_LEVEL
    /// - TOOLGATE_LOG_FORMAT
    /// - TOOLGATE_BIND
    /// - TOOLGATE_PORT
    /// - TOOLGATE_SECURE_COOKIES
    /// - TOOLGATE_QUOTA_WINDOW_SECS
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("TOOLGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TOOLGATE_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(bind) = std::env::var("TOOLGATE_BIND") {
            self.server.bind = bind;
        }
        if let Ok(port) = std::env::var("TOOLGATE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                if port > 0 {
                    self.server.port = port;
                }
            }
        }
        if let Ok(secure) = std::env::var("TOOLGATE_SECURE_COOKIES") {
            self.server.secure_cookies = secure.parse().unwrap_or(self.server.secure_cookies);
        }
        if let Ok(window) = std::env::var("TOOLGATE_QUOTA_WINDOW_SECS") {
            if let Ok(window) = window.parse::<i64>() {
                if window >= 60 {
                    self.quota.window_secs = window;
                }
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.quota.window_secs < 60 {
            anyhow::bail!("Quota window must be at least 60 seconds");
        }

        if self.guest.cookie_name.is_empty() {
            anyhow::bail!("Guest cookie name must not be empty");
        }
        if self
            .guest
            .cookie_name
            .contains(|c: char| c == '=' || c == ';' || c.is_whitespace())
        {
            anyhow::bail!(
                "Guest cookie name '{}' contains characters not allowed in a cookie name",
                self.guest.cookie_name
            );
        }
        if self.guest.cookie_max_age_days == 0 {
            anyhow::bail!("Guest cookie lifetime must be at least 1 day");
        }

        for (slug, url) in &self.upstream.urls {
            if Resource::from_slug(slug).is_none() {
                anyhow::bail!(
                    "Upstream configured for unknown tool '{}'. Known tools: {}",
                    slug,
                    Resource::ALL
                        .iter()
                        .map(|r| r.slug())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("Upstream URL for '{}' must be http(s): {}", slug, url);
            }
        }

        for (token, entry) in &self.sessions {
            if token.is_empty() {
                anyhow::bail!("Session tokens must not be empty");
            }
            if entry.user_id.is_empty() || entry.user_id.contains(':') {
                anyhow::bail!(
                    "Session user id '{}' must be a non-empty opaque id without ':'",
                    entry.user_id
                );
            }
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Upstream URLs keyed by resolved tool.
    pub fn upstream_urls(&self) -> HashMap<Resource, String> {
        self.upstream
            .urls
            .iter()
            .filter_map(|(slug, url)| Resource::from_slug(slug).map(|r| (r, url.clone())))
            .collect()
    }

    /// Guest cookie lifetime in seconds.
    pub fn guest_cookie_max_age_secs(&self) -> u64 {
        u64::from(self.guest.cookie_max_age_days) * 24 * 60 * 60
    }
}
