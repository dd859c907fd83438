//! Structured logging bootstrap.
//!
//! Every module in the crate logs through `tracing`; this only installs a
//! subscriber for applications (and benches) that do not bring their own.

use anyhow::{Context, Result};
use std::env;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level or filter directive (e.g. `info`, `muxchain=debug`)
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    /// Read `MUXCHAIN_LOG_LEVEL` and `MUXCHAIN_LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("MUXCHAIN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("MUXCHAIN_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
        }
    }
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Calling it again is a no-op.
///
/// `RUST_LOG` wins over `config.log_level` when it is set.
pub fn init(config: &LogConfig) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level directive")?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    INSTALLED.get_or_init(|| ());
    Ok(())
}
