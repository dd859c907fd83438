//! # Runtime Configuration Module
//!
//! Router behaviour that is tuned per deployment rather than per route.
//!
//! ## Environment Variables
//!
//! - `MUXCHAIN_STRICT_SLASH` - `true` makes a trailing slash significant
//!   (`/users/` no longer matches `/users`). Default: `false`.
//! - `MUXCHAIN_SLOW_DISPATCH_MS` - dispatches slower than this many
//!   milliseconds are logged at `warn`. Default: `1`.
//! - `MUXCHAIN_REQUEST_ID_HEADER` - header carrying an inbound request id.
//!   Default: `x-request-id`.
//!
//! ## Usage
//!
//! ```rust
//! use muxchain::runtime_config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("strict slash: {}", config.strict_slash);
//! ```
//!
//! The same settings can be embedded in an application's TOML file:
//!
//! ```rust
//! use muxchain::runtime_config::RouterConfig;
//!
//! let config = RouterConfig::from_toml_str("strict_slash = true").unwrap();
//! assert!(config.strict_slash);
//! assert_eq!(config.slow_dispatch_ms, 1);
//! ```

use serde::Deserialize;
use std::env;

/// Default header used to carry request ids.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Router configuration loaded from environment variables or TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Whether a trailing slash is significant when matching paths
    pub strict_slash: bool,
    /// Slow dispatch warning threshold in milliseconds
    pub slow_dispatch_ms: u64,
    /// Header read for inbound request ids and echoed on responses
    pub request_id_header: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strict_slash: false,
            slow_dispatch_ms: 1,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strict_slash: env::var("MUXCHAIN_STRICT_SLASH")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.strict_slash),
            slow_dispatch_ms: env::var("MUXCHAIN_SLOW_DISPATCH_MS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.slow_dispatch_ms),
            request_id_header: env::var("MUXCHAIN_REQUEST_ID_HEADER")
                .ok()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.request_id_header),
        }
    }

    /// Parse configuration from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: RouterConfig = toml::from_str(s)?;
        Ok(config)
    }
}
