use crate::components::MiddlewareConstructor;
use crate::middleware::Middleware;
use std::fmt;
use std::sync::Arc;

/// A resolved middleware stage.
///
/// The kind is fixed when the descriptor is created; a pipeline never
/// re-inspects a component to decide how to run it.
#[derive(Clone)]
pub enum MiddlewareDescriptor {
    /// One shared instance serves every request.
    Stateless(Arc<dyn Middleware>),
    /// A fresh instance is built and constructed for each request.
    Constructible(Arc<MiddlewareConstructor>),
}

impl MiddlewareDescriptor {
    pub fn name(&self) -> &str {
        match self {
            MiddlewareDescriptor::Stateless(m) => m.name(),
            MiddlewareDescriptor::Constructible(c) => c.type_name(),
        }
    }

    pub fn is_constructible(&self) -> bool {
        matches!(self, MiddlewareDescriptor::Constructible(_))
    }
}

impl fmt::Debug for MiddlewareDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareDescriptor::Stateless(m) => f.debug_tuple("Stateless").field(&m.name()).finish(),
            MiddlewareDescriptor::Constructible(c) => {
                f.debug_tuple("Constructible").field(&c.type_name()).finish()
            }
        }
    }
}
