//! # Router Module
//!
//! Registration and dispatch: routes, groups, controllers and the path-matching
//! seam they sit on.
//!
//! ## Overview
//!
//! - [`Router`] owns the route table, the global middleware list, the
//!   not-found/method-not-allowed fallbacks and the component cache
//! - [`RouteGroup`] gives a prefix and/or host to everything registered under it
//! - [`Controller`] groups handlers behind one value, optionally rebuilt for
//!   every request
//! - [`PathMatcher`] is the matching collaborator; [`RadixMatcher`] is the
//!   default implementation
//!
//! ## Middleware Order
//!
//! A matched request runs global middleware, then each enclosing group's from
//! outermost to innermost, then the route's own, then the handler. Each stage
//! runs once unless an earlier one answers without calling `next`.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use muxchain::dispatcher::{HandlerRequest, HandlerResponse};
//! use muxchain::middleware::{AuthMiddleware, MiddlewareSpec};
//! use muxchain::router::{RouteGroup, Router};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new();
//! router.get("/health", |_req| Ok(Some(HandlerResponse::text(200, "ok"))))?;
//!
//! let admin = router.group(RouteGroup::prefix("/admin"), |admin| {
//!     admin.get("/stats", |_req| Ok(None))?;
//!     Ok(())
//! })?;
//! admin.use_middleware(MiddlewareSpec::shared(AuthMiddleware::new("secret")));
//!
//! let resp = router.dispatch(HandlerRequest::new(Method::GET, "/admin/stats"))?;
//! assert_eq!(resp.status, 401);
//! # Ok(())
//! # }
//! ```

mod controller;
mod core;
mod matcher;
mod radix;
mod route;
mod scope;
#[cfg(test)]
mod tests;

pub use controller::{Controller, ControllerScope};
pub use core::{AllowedMethods, Router};
pub use matcher::{MatchOutcome, PathMatcher, RouteId};
pub use radix::RadixMatcher;
pub use route::{RouteHandle, RouteInfo};
pub use scope::RouteGroup;
