//! Logging infrastructure for modelmap.
//!
//! The engines log through `tracing`: resolver cache misses and population
//! decisions at debug level, deprecated parameters (under the
//! `modelmap::deprecation` target) and unloaded relationships at warn level.
//! This module installs a subscriber for applications that do not have one.
//!
//! # Environment Variables
//!
//! - `MODELMAP_DEBUG=true` - Enable debug logging
//! - `MODELMAP_DEBUG=1` - Enable debug logging
//! - `MODELMAP_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `MODELMAP_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use modelmap_core::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `MODELMAP_DEBUG` environment variable.
///
/// Returns `true` if `MODELMAP_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("MODELMAP_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn normalize_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn normalize_format(format: &str) -> &'static str {
    match format.to_lowercase().as_str() {
        "pretty" => "pretty",
        "compact" => "compact",
        _ => "json",
    }
}

/// Get the configured log level from `MODELMAP_LOG_LEVEL` environment variable.
///
/// Defaults to "debug" if `MODELMAP_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    env::var("MODELMAP_LOG_LEVEL")
        .ok()
        .and_then(|level| normalize_level(&level))
        .unwrap_or(fallback)
}

/// Get the configured log format from `MODELMAP_LOG_FORMAT` environment variable.
///
/// Defaults to "json" for structured logging.
pub fn get_log_format() -> &'static str {
    env::var("MODELMAP_LOG_FORMAT")
        .map(|f| normalize_format(&f))
        .unwrap_or("json")
}

/// Initialize the modelmap logging system from the environment.
///
/// This should be called once at application startup. Subsequent calls are no-ops.
/// Nothing is installed unless `MODELMAP_DEBUG` or `MODELMAP_LOG_LEVEL` is set.
pub fn init() {
    if !is_debug_enabled() && env::var("MODELMAP_LOG_LEVEL").is_err() {
        return;
    }
    install(get_log_level(), get_log_format());
}

/// Initialize logging from the `[logging]` section of the configuration.
///
/// Environment variables take precedence over the configuration.
pub fn init_with_config(config: &LoggingConfig) {
    let level = env::var("MODELMAP_LOG_LEVEL")
        .ok()
        .and_then(|level| normalize_level(&level))
        .or_else(|| config.level.as_deref().and_then(normalize_level));
    let Some(level) = level.or(is_debug_enabled().then_some("debug")) else {
        return;
    };
    let format = env::var("MODELMAP_LOG_FORMAT")
        .ok()
        .or_else(|| config.format.clone())
        .map_or("json", |f| normalize_format(&f));
    install(level, format);
}

/// Initialize logging with a specific level.
///
/// ```rust,no_run
/// use modelmap_core::logging;
///
/// logging::init_with_level("trace");
/// ```
pub fn init_with_level(level: &str) {
    install(normalize_level(level).unwrap_or("warn"), get_log_format());
}

/// Initialize logging for debugging (convenience function).
pub fn init_debug() {
    install("debug", get_log_format());
}

#[cfg_attr(not(feature = "tracing-subscriber"), allow(unused_variables))]
fn install(level: &'static str, format: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "modelmap={},modelmap_core={}",
                level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match format {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format, "modelmap logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            // Silent unless the application installs its own subscriber
        }
    });
}

/// Macro for conditional debug logging.
///
/// Only logs if `MODELMAP_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! modelmap_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional trace logging.
#[macro_export]
macro_rules! modelmap_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
