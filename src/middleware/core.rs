use crate::components::{ComponentCache, Construct, MiddlewareConstructor};
use crate::dispatcher::{HandlerRequest, HandlerResult};
use crate::pipeline::{MiddlewareDescriptor, Next};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// A composable stage wrapped around a terminal handler.
///
/// `handle` receives the request and the rest of the chain. Return
/// `next.run(req)` (optionally after changing `req`) to continue, post-process
/// what it returns, or return a response without calling `next` to stop the
/// chain.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult;

    /// Name used in logs and [`Pipeline::stage_names`](crate::pipeline::Pipeline::stage_names).
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Adapter that lets a closure act as middleware.
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(HandlerRequest, Next<'_>) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        (self.f)(req, next)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

enum SpecKind {
    Shared(Arc<dyn Middleware>),
    PerRequest(fn(&ComponentCache) -> Arc<MiddlewareConstructor>),
}

/// Middleware as handed to `use_middleware`, before the router resolves it.
///
/// ```rust
/// use muxchain::components::Construct;
/// use muxchain::dispatcher::{HandlerRequest, HandlerResult};
/// use muxchain::middleware::{Middleware, MiddlewareSpec};
/// use muxchain::pipeline::Next;
/// use muxchain::router::Router;
///
/// #[derive(Default)]
/// struct Started(u128);
///
/// impl Construct for Started {
///     fn construct(&mut self, _req: &HandlerRequest) {
///         self.0 = std::time::UNIX_EPOCH.elapsed().map(|d| d.as_nanos()).unwrap_or(0);
///     }
/// }
///
/// impl Middleware for Started {
///     fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
///         let mut resp = next.run(req)?;
///         resp.set_header("x-started", self.0.to_string());
///         Ok(Some(resp))
///     }
/// }
///
/// let router = Router::new();
/// router.use_middleware(MiddlewareSpec::per_request::<Started>());
/// ```
pub struct MiddlewareSpec(SpecKind);

fn constructor_of<M>(cache: &ComponentCache) -> Arc<MiddlewareConstructor>
where
    M: Middleware + Construct + Default,
{
    cache.middleware_constructor::<M>()
}

impl MiddlewareSpec {
    /// A stateless middleware: this one value serves every request.
    ///
    /// The registration call decides the kind, not the type. A type that
    /// implements [`Construct`] but is registered here is used as-is and its
    /// `construct` hook never runs; register it with
    /// [`per_request`](Self::per_request) to get a fresh instance per request.
    pub fn shared<M: Middleware>(middleware: M) -> Self {
        Self(SpecKind::Shared(Arc::new(middleware)))
    }

    /// Like [`shared`](Self::shared), for a value the caller keeps a handle to.
    /// [`Construct`] is not consulted here either.
    pub fn shared_arc<M: Middleware>(middleware: Arc<M>) -> Self {
        Self(SpecKind::Shared(middleware))
    }

    /// A constructible middleware: a fresh `M::default()` is built and
    /// constructed for every request that reaches this stage.
    pub fn per_request<M>() -> Self
    where
        M: Middleware + Construct + Default,
    {
        Self(SpecKind::PerRequest(constructor_of::<M>))
    }

    /// A stateless middleware from a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(HandlerRequest, Next<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::shared(FnMiddleware { f })
    }

    /// Classify into a descriptor. Constructor handles come from `cache`.
    pub(crate) fn resolve(self, cache: &ComponentCache) -> MiddlewareDescriptor {
        match self.0 {
            SpecKind::Shared(m) => MiddlewareDescriptor::Stateless(m),
            SpecKind::PerRequest(lookup) => MiddlewareDescriptor::Constructible(lookup(cache)),
        }
    }
}

impl fmt::Debug for MiddlewareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            SpecKind::Shared(m) => f.debug_tuple("Shared").field(&m.name()).finish(),
            SpecKind::PerRequest(_) => f.write_str("PerRequest"),
        }
    }
}
