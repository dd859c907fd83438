//! # Pipeline Module
//!
//! Chain-of-responsibility execution of middleware around a terminal handler.
//!
//! Stage *i* receives the request and a [`Next`] bound to stage *i + 1*. A
//! stage can pass the request on (optionally modified), post-process what
//! comes back, or return its own response without calling `next`, which ends
//! the chain there.
//!
//! Constructible stages are instantiated right before they run, with the
//! request as earlier stages left it, so per-request state never leaks
//! between requests.

mod core;
mod descriptor;

pub use core::{HandlerFn, Next, Pipeline};
pub use descriptor::MiddlewareDescriptor;
