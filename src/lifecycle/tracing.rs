//! # Observability & Tracing
//!
//! This module provides the logging sink for the whole runtime.
//!
//! ## Overview
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! Everything else in the crate only uses the `tracing` macros with structured fields:
//!
//! ```rust,ignore
//! info!(component = %name, "Started");
//! warn!(action, connection = %self.id, error = %e, "Action failed");
//! ```
//!
//! ## Configuration
//!
//! - **Level**: `RUST_LOG` wins when set; otherwise [`LoggerConfig::level`] (`LOG_LEVEL`)
//! - **Colors**: [`LoggerConfig::colorize`] (`LOG_COLORIZE`)
//! - **Timestamps**: [`LoggerConfig::include_timestamps`] (`LOG_TIMESTAMPS`)
//!
//! The format is compact and hides the crate/module prefix (`with_target(false)`).
//!
//! ## Usage Examples
//!
//! ```bash
//! # Boot and shutdown milestones, one line per request
//! RUST_LOG=info cargo run
//!
//! # Component registration, per-hook progress, registered actions
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatch pipeline
//! RUST_LOG=action_runtime::framework=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Lifecycle**: every hook call with component name, boot and shutdown milestones
//! - **Requests**: one line per `act` call with action, connection id, method, url and duration
//! - **Draining**: pending request counts while the web server waits to stop
//! - **Errors**: boot failures, failing `stop` hooks, failed actions with their typed error

use crate::config::LoggerConfig;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide subscriber.
///
/// Safe to call more than once; only the first call installs anything (later
/// calls, e.g. from several tests, are ignored).
///
/// # Example
///
/// ```ignore
/// setup_tracing(&config.logger);
/// tracing::info!("Application started");
/// ```
pub fn setup_tracing(config: &LoggerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.colorize)
        .compact();

    let _ = if config.include_timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
}
