//! # Middleware Module
//!
//! The [`Middleware`] trait, [`MiddlewareSpec`] for registering stateless or
//! per-request middleware, and a few stock stages:
//!
//! - [`AuthMiddleware`]: static token check with a 401 short-circuit
//! - [`MetricsMiddleware`]: request counts, latency, per-status and per-route counters
//! - [`TracingMiddleware`]: a `request` span around the rest of the chain
//! - [`RecoveryMiddleware`]: panics and errors further down become a 500

mod auth;
mod core;
mod metrics;
mod recovery;
mod tracing;

pub use auth::AuthMiddleware;
pub use core::{FnMiddleware, Middleware, MiddlewareSpec};
pub use metrics::MetricsMiddleware;
pub use recovery::RecoveryMiddleware;
pub use tracing::TracingMiddleware;
