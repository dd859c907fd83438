//! # Components Module
//!
//! Middleware and controllers come in two kinds:
//!
//! - **stateless**: one shared value serves every request
//! - **constructible**: a fresh instance is built for each request from
//!   `Default` and populated by its [`Construct`] hook
//!
//! The kind is decided once, when a component is registered, and recorded in
//! its descriptor. [`ComponentCache`] keeps what is needed to build and invoke
//! constructible components so that work is done once per type, not once per
//! request.

mod cache;
mod lifecycle;

pub use cache::{ComponentCache, ControllerEntry, MiddlewareConstructor};
pub use lifecycle::{Action, Construct, Lifecycle};
