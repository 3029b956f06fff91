//! Configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.
//! [`Config::from_lookup`] takes any key → value function, which is how tests
//! build configs without touching the process environment.

use crate::framework::{ErrorType, TypedError};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub process: ProcessConfig,
    pub logger: LoggerConfig,
    pub server: ServersConfig,
    pub session: SessionConfig,
}

/// Process identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Reported by the `status` action and the `x-server-name` header
    pub name: String,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Level used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
    /// ANSI colors
    pub colorize: bool,
    /// Prefix lines with a timestamp
    pub include_timestamps: bool,
}

/// Front-end servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersConfig {
    pub web: WebConfig,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Register the web server at boot
    pub enabled: bool,
    /// Host to bind to
    pub host: String,
    /// Port to bind to (0 picks a free port)
    pub port: u16,
    /// Path prefix for action requests (e.g. `/api`)
    pub api_route: String,
    /// Path prefix for static assets (e.g. `/assets`)
    pub asset_route: String,
    /// Directory served under `asset_route`
    pub assets_dir: String,
    /// Directory searched for pages
    pub pages_dir: String,
    /// How often a draining server re-checks its in-flight requests
    pub drain_poll_interval_ms: u64,
}

impl WebConfig {
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }
}

/// Upper bound for `SESSION_TTL`: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the connection id
    pub cookie_name: String,
    /// Session lifetime in seconds (also the cookie `Max-Age`)
    pub ttl_secs: u64,
    /// How often expired sessions are purged, in seconds
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process: ProcessConfig {
                name: "action-runtime".to_string(),
            },
            logger: LoggerConfig {
                level: "info".to_string(),
                colorize: true,
                include_timestamps: true,
            },
            server: ServersConfig {
                web: WebConfig {
                    enabled: true,
                    host: "0.0.0.0".to_string(),
                    port: 8080,
                    api_route: "/api".to_string(),
                    asset_route: "/assets".to_string(),
                    assets_dir: "assets".to_string(),
                    pages_dir: "pages".to_string(),
                    drain_poll_interval_ms: 100,
                },
            },
            session: SessionConfig {
                cookie_name: "__session".to_string(),
                ttl_secs: 60 * 60 * 24,
                sweep_interval_secs: 60,
            },
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// `CONFIG_ERROR` for unparsable values or malformed routes.
    pub fn from_env() -> Result<Self, TypedError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from `lookup`, falling back to [`Config::default`] for
    /// every key it does not know.
    ///
    /// # Errors
    /// `CONFIG_ERROR` for unparsable values or malformed routes.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TypedError> {
        let defaults = Self::default();
        let web = defaults.server.web;

        let config = Self {
            process: ProcessConfig {
                name: lookup("PROCESS_NAME").unwrap_or(defaults.process.name),
            },
            logger: LoggerConfig {
                level: lookup("LOG_LEVEL").unwrap_or(defaults.logger.level),
                colorize: parse(&lookup, "LOG_COLORIZE", defaults.logger.colorize)?,
                include_timestamps: parse(
                    &lookup,
                    "LOG_TIMESTAMPS",
                    defaults.logger.include_timestamps,
                )?,
            },
            server: ServersConfig {
                web: WebConfig {
                    enabled: parse(&lookup, "WEB_SERVER_ENABLED", web.enabled)?,
                    host: lookup("WEB_SERVER_HOST").unwrap_or(web.host),
                    port: parse(&lookup, "WEB_SERVER_PORT", web.port)?,
                    api_route: lookup("WEB_SERVER_API_ROUTE").unwrap_or(web.api_route),
                    asset_route: lookup("WEB_SERVER_ASSET_ROUTE").unwrap_or(web.asset_route),
                    assets_dir: lookup("WEB_SERVER_ASSETS_DIR").unwrap_or(web.assets_dir),
                    pages_dir: lookup("WEB_SERVER_PAGES_DIR").unwrap_or(web.pages_dir),
                    drain_poll_interval_ms: parse(
                        &lookup,
                        "WEB_SERVER_DRAIN_POLL_MS",
                        web.drain_poll_interval_ms,
                    )?,
                },
            },
            session: SessionConfig {
                cookie_name: lookup("SESSION_COOKIE_NAME").unwrap_or(defaults.session.cookie_name),
                ttl_secs: parse(&lookup, "SESSION_TTL", defaults.session.ttl_secs)?,
                sweep_interval_secs: parse(
                    &lookup,
                    "SESSION_SWEEP_INTERVAL",
                    defaults.session.sweep_interval_secs,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TypedError> {
        let web = &self.server.web;
        for (key, route) in [
            ("WEB_SERVER_API_ROUTE", &web.api_route),
            ("WEB_SERVER_ASSET_ROUTE", &web.asset_route),
        ] {
            if !route.starts_with('/') || route.len() < 2 || route.ends_with('/') {
                return Err(TypedError::new(
                    format!("{key} must start with `/` and must not end with `/`"),
                    ErrorType::ConfigError,
                )
                .with_key(key)
                .with_value(route.clone().into()));
            }
        }
        if web.api_route == web.asset_route {
            return Err(TypedError::new(
                "the api and asset routes must differ",
                ErrorType::ConfigError,
            )
            .with_key("WEB_SERVER_ASSET_ROUTE"));
        }
        if web.drain_poll_interval_ms == 0 {
            return Err(TypedError::new(
                "the drain poll interval must be positive",
                ErrorType::ConfigError,
            )
            .with_key("WEB_SERVER_DRAIN_POLL_MS"));
        }
        if self.session.ttl_secs == 0 || self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(TypedError::new(
                format!("the session ttl must be between 1 and {MAX_SESSION_TTL_SECS} seconds"),
                ErrorType::ConfigError,
            )
            .with_key("SESSION_TTL")
            .with_value(self.session.ttl_secs.into()));
        }
        if self.session.cookie_name.is_empty() {
            return Err(TypedError::new(
                "the session cookie name cannot be empty",
                ErrorType::ConfigError,
            )
            .with_key("SESSION_COOKIE_NAME"));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, TypedError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            TypedError::new(format!("{key} has an invalid value"), ErrorType::ConfigError)
                .with_key(key)
                .with_value(raw.into())
        }),
    }
}
