//! # Dispatcher Module
//!
//! The values that travel through a dispatch: [`HandlerRequest`] going in,
//! [`HandlerResponse`] coming out, and [`HandlerResult`] as the outcome of
//! every middleware stage and terminal handler.
//!
//! ## Request Flow
//!
//! 1. The transport builds a [`HandlerRequest`] (`HandlerRequest::new(method, target)`)
//! 2. [`Router::dispatch`](crate::router::Router::dispatch) matches it, fills
//!    `path_params` and `route`, and runs the route's pipeline
//! 3. Each stage may rewrite the request or attach values to `extensions`
//!    before handing it to the next stage
//! 4. The resulting [`HandlerResponse`] writes itself to an output sink with
//!    [`HandlerResponse::write_to`]
//!
//! ## Absent Responses
//!
//! Handlers and middleware return `Ok(None)` when they have nothing to say.
//! The engine replaces that with the default for the current phase (200 for a
//! matched route, 404/405 for the fallbacks), so a transport never sees a
//! missing response.

mod core;
mod wire;

pub use core::{
    HandlerRequest, HandlerResponse, HandlerResult, HeaderVec, ParamVec, MAX_INLINE_HEADERS,
    MAX_INLINE_PARAMS,
};
