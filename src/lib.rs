//! # muxchain
//!
//! Request dispatch for HTTP routers: route groups, controllers and
//! per-request middleware chains.
//!
//! ## Overview
//!
//! A [`Router`](router::Router) matches each request to a route and runs the
//! route's middleware chain around its handler. Middleware comes from three
//! places, in this order:
//!
//! 1. the global list on the root router
//! 2. every enclosing [`RouteGroup`](router::RouteGroup), outermost first
//! 3. the route itself
//!
//! Middleware is either **stateless** (one shared value) or **constructible**
//! (a fresh value is built and given the request before it runs). The same
//! split applies to [controllers](router::Controller).
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - request and response values, HTTP/1.1 response writing
//! - **[`components`]** - lifecycle capability and the component descriptor cache
//! - **[`pipeline`]** - chain-of-responsibility execution
//! - **[`middleware`]** - the middleware trait and stock middleware
//! - **[`router`]** - registration, path matching and dispatch
//! - **[`error`]** - registration and dispatch errors
//! - **[`runtime_config`]** - router configuration from env or TOML
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`ids`]** - ULID request identifiers
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use muxchain::dispatcher::{HandlerRequest, HandlerResponse};
//! use muxchain::middleware::{MiddlewareSpec, RecoveryMiddleware, TracingMiddleware};
//! use muxchain::router::Router;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new();
//! router.use_middlewares([
//!     MiddlewareSpec::shared(RecoveryMiddleware::new()),
//!     MiddlewareSpec::shared(TracingMiddleware::new()),
//! ]);
//! router
//!     .get("/pets/{id}", |req| {
//!         let id = req.get_path_param("id").unwrap_or_default();
//!         Ok(Some(HandlerResponse::json(200, json!({ "id": id }))))
//!     })?
//!     .name("pet");
//!
//! let mut out = Vec::new();
//! let resp = router.serve(HandlerRequest::new(Method::GET, "/pets/12"), &mut out)?;
//! assert_eq!(resp.status, 200);
//! assert_eq!(router.url_for("pet", &[("id", "3")]).as_deref(), Some("/pets/3"));
//! # Ok(())
//! # }
//! ```

pub mod components;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod runtime_config;

pub use dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
pub use error::{DispatchError, RegistrationError};
pub use middleware::{Middleware, MiddlewareSpec};
pub use router::{Controller, RouteGroup, Router};
