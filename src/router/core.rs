use super::controller::{Controller, ControllerScope};
use super::matcher::{MatchOutcome, PathMatcher, RouteId};
use super::radix::RadixMatcher;
use super::route::{RouteHandle, RouteInfo, RouteNode};
use super::scope::{RouteGroup, Scope};
use crate::components::ComponentCache;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::error::{DispatchError, RegistrationError};
use crate::middleware::MiddlewareSpec;
use crate::pipeline::HandlerFn;
use crate::runtime_config::RouterConfig;
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use http::Method;
use parking_lot::RwLock;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Methods registered for a path, attached to the request handed to a
/// method-not-allowed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods(pub Vec<Method>);

struct Fallback {
    handler: HandlerFn,
}

/// State shared by a router and every group, controller scope and route
/// handle created from it.
pub(crate) struct RouterShared {
    config: RouterConfig,
    pub(crate) matcher: RwLock<Box<dyn PathMatcher>>,
    routes: DashMap<RouteId, Arc<RouteNode>>,
    pub(crate) cache: ComponentCache,
    not_found: ArcSwapOption<Fallback>,
    method_not_allowed: ArcSwapOption<Fallback>,
}

/// Request router
///
/// A `Router` is a registration scope over shared routing state. The value
/// from [`Router::new`] is the root scope, whose middleware list is the global
/// one; [`group`](Router::group) and [`controller`](Router::controller) return
/// routers for nested scopes. All of them dispatch against the full route table.
///
/// # Middleware timing
///
/// A route's chain is built the first time the route is dispatched. Middleware
/// added to a scope after that does not change the route; middleware added
/// through the route's own [`RouteHandle::use_middleware`] rebuilds it at once.
/// A group copies its parent's list when it is created.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use muxchain::dispatcher::{HandlerRequest, HandlerResponse};
/// use muxchain::router::{RouteGroup, Router};
///
/// let router = Router::new();
/// router
///     .group(RouteGroup::prefix("/api"), |api| {
///         api.get("/users/{id}", |req| {
///             let id = req.get_path_param("id").unwrap_or_default().to_string();
///             Ok(Some(HandlerResponse::text(200, id)))
///         })?;
///         Ok(())
///     })
///     .unwrap();
///
/// let resp = router.dispatch(HandlerRequest::new(Method::GET, "/api/users/7")).unwrap();
/// assert_eq!(resp.body, "7");
/// ```
#[derive(Clone)]
pub struct Router {
    shared: Arc<RouterShared>,
    scope: Arc<Scope>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let matcher = RadixMatcher::new(config.strict_slash);
        Self::with_matcher(config, Box::new(matcher))
    }

    /// Router backed by a custom path matcher.
    pub fn with_matcher(config: RouterConfig, matcher: Box<dyn PathMatcher>) -> Self {
        info!(
            strict_slash = config.strict_slash,
            slow_dispatch_ms = config.slow_dispatch_ms,
            request_id_header = %config.request_id_header,
            "Router created"
        );
        Self {
            shared: Arc::new(RouterShared {
                config,
                matcher: RwLock::new(matcher),
                routes: DashMap::new(),
                cache: ComponentCache::new(),
                not_found: ArcSwapOption::empty(),
                method_not_allowed: ArcSwapOption::empty(),
            }),
            scope: Arc::new(Scope::root()),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.shared.config
    }

    /// The component cache shared by every scope of this router.
    pub fn cache(&self) -> &ComponentCache {
        &self.shared.cache
    }

    /// Path prefix of this scope (empty at the root).
    pub fn prefix(&self) -> &str {
        self.scope.prefix()
    }

    /// Host template of this scope, if any.
    pub fn host(&self) -> Option<&str> {
        self.scope.host()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append middleware to this scope.
    ///
    /// On the root router this is the global list. Routes whose chain has
    /// already been built are not affected.
    pub fn use_middleware(&self, spec: MiddlewareSpec) -> &Self {
        let descriptor = spec.resolve(&self.shared.cache);
        debug!(
            prefix = %self.scope.prefix(),
            middleware = descriptor.name(),
            constructible = descriptor.is_constructible(),
            "Middleware added"
        );
        self.scope.append(descriptor);
        self
    }

    pub fn use_middlewares(&self, specs: impl IntoIterator<Item = MiddlewareSpec>) -> &Self {
        for spec in specs {
            self.use_middleware(spec);
        }
        self
    }

    pub(crate) fn child(&self, group: &RouteGroup) -> Router {
        Router {
            shared: Arc::clone(&self.shared),
            scope: Arc::new(self.scope.child(group)),
        }
    }

    /// Create a nested scope and run `builder` inside it.
    ///
    /// The returned router is the group itself; middleware added to it later
    /// still reaches its routes that have not been dispatched yet.
    pub fn group<F>(&self, group: RouteGroup, builder: F) -> Result<Router, RegistrationError>
    where
        F: FnOnce(&Router) -> Result<(), RegistrationError>,
    {
        let child = self.child(&group);
        debug!(prefix = %child.prefix(), host = ?child.host(), "Route group created");
        builder(&child)?;
        Ok(child)
    }

    /// Attach a controller and run `builder` inside its group.
    ///
    /// Fails with [`RegistrationError::NotInstantiable`] if the controller
    /// asks for per-request instances but has no blank-instance factory.
    pub fn controller<C, F>(&self, controller: C, builder: F) -> Result<Router, RegistrationError>
    where
        C: Controller,
        F: FnOnce(&ControllerScope<C>) -> Result<(), RegistrationError>,
    {
        let scope = ControllerScope::bind(self, controller)?;
        info!(
            controller = std::any::type_name::<C>(),
            prefix = %scope.prefix(),
            per_request = scope.is_per_request(),
            "Controller attached"
        );
        builder(&scope)?;
        Ok(scope.into_router())
    }

    /// Register `handler` for `methods` at `path` (relative to this scope).
    pub fn route<F>(
        &self,
        methods: &[Method],
        path: &str,
        handler: F,
    ) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(methods, path, Arc::new(handler))
    }

    pub(crate) fn register(
        &self,
        methods: &[Method],
        path: &str,
        handler: HandlerFn,
    ) -> Result<RouteHandle, RegistrationError> {
        let pattern = self.scope.full_path(path);
        if methods.is_empty() {
            return Err(RegistrationError::EmptyMethods { path: pattern });
        }
        let host = self.scope.host();
        let id = self.shared.matcher.write().register(methods, &pattern, host)?;

        let info = Arc::new(RouteInfo {
            id,
            methods: methods.to_vec(),
            pattern,
            host: host.map(str::to_string),
        });
        info!(
            route_id = %id,
            methods = ?info.methods,
            pattern = %info.pattern,
            host = ?info.host,
            "Route registered"
        );
        let node = Arc::new(RouteNode::new(info, Arc::clone(&self.scope), handler));
        self.shared.routes.insert(id, Arc::clone(&node));
        Ok(RouteHandle {
            node,
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn get<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::GET], path, handler)
    }

    pub fn post<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::POST], path, handler)
    }

    pub fn put<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::PUT], path, handler)
    }

    pub fn patch<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::PATCH], path, handler)
    }

    pub fn delete<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::DELETE], path, handler)
    }

    pub fn options<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::OPTIONS], path, handler)
    }

    pub fn head<F>(&self, path: &str, handler: F) -> Result<RouteHandle, RegistrationError>
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(&[Method::HEAD], path, handler)
    }

    /// Replace the handler for requests no route matches.
    ///
    /// An absent result still becomes a plain 404.
    pub fn on_not_found<F>(&self, handler: F) -> &Self
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.shared.not_found.store(Some(Arc::new(Fallback {
            handler: Arc::new(handler),
        })));
        self
    }

    /// Replace the handler for requests whose path matches but method does not.
    ///
    /// The request carries the registered methods as an [`AllowedMethods`]
    /// extension. An absent result still becomes a 405 with an `allow` header.
    pub fn on_method_not_allowed<F>(&self, handler: F) -> &Self
    where
        F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.shared.method_not_allowed.store(Some(Arc::new(Fallback {
            handler: Arc::new(handler),
        })));
        self
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Route registered under `name` with [`RouteHandle::name`].
    pub fn route_named(&self, name: &str) -> Option<Arc<RouteInfo>> {
        let id = self.shared.matcher.read().named(name)?;
        let node = self.shared.routes.get(&id)?;
        Some(Arc::clone(&node.info))
    }

    /// Path of the route named `name` with its placeholders filled from `params`.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.route_named(name)?.url(params)
    }

    /// All registered routes in registration order.
    pub fn routes(&self) -> Vec<Arc<RouteInfo>> {
        let mut routes: Vec<Arc<RouteInfo>> = self
            .shared
            .routes
            .iter()
            .map(|entry| Arc::clone(&entry.value().info))
            .collect();
        routes.sort_by_key(|r| r.id);
        routes
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Answer one request.
    ///
    /// Always yields a response unless a stage or handler fails and nothing in
    /// the chain recovers it.
    pub fn dispatch(&self, mut req: HandlerRequest) -> Result<HandlerResponse, DispatchError> {
        let start = Instant::now();
        req.adopt_request_id(&self.shared.config.request_id_header);
        let method = req.method.clone();
        let path = req.path.clone();

        let outcome = {
            let matcher = self.shared.matcher.read();
            matcher.match_route(&req.method, req.host(), &req.path)
        };

        let result = match outcome {
            MatchOutcome::Matched { id, params } => {
                let node = self.shared.routes.get(&id).map(|n| Arc::clone(n.value()));
                match node {
                    Some(node) => {
                        debug!(
                            method = %method,
                            path = %path,
                            route = %node.info.pattern,
                            params = ?params,
                            "Route matched"
                        );
                        req.path_params = params;
                        req.route = Some(Arc::clone(&node.info));
                        node.pipeline().execute(req)
                    }
                    None => self.not_found(req),
                }
            }
            MatchOutcome::MethodNotAllowed { allowed } => {
                debug!(method = %method, path = %path, allowed = ?allowed, "Method not allowed");
                self.method_not_allowed(req, allowed)
            }
            MatchOutcome::NotFound => {
                warn!(method = %method, path = %path, "No route matched");
                self.not_found(req)
            }
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() > u128::from(self.shared.config.slow_dispatch_ms) {
            warn!(
                method = %method,
                path = %path,
                status = result.as_ref().map(|r| r.status).ok(),
                duration_us = elapsed.as_micros() as u64,
                "Slow dispatch"
            );
        }
        result
    }

    /// Dispatch `req` and write the response to `sink`.
    pub fn serve<W: Write + ?Sized>(
        &self,
        req: HandlerRequest,
        sink: &mut W,
    ) -> Result<HandlerResponse, DispatchError> {
        let resp = self.dispatch(req)?;
        resp.write_to(sink)?;
        Ok(resp)
    }

    fn not_found(&self, req: HandlerRequest) -> Result<HandlerResponse, DispatchError> {
        let resp = match self.shared.not_found.load_full() {
            Some(fallback) => (fallback.handler)(req)?,
            None => None,
        };
        Ok(resp.unwrap_or_else(|| HandlerResponse::status_only(404)))
    }

    fn method_not_allowed(
        &self,
        mut req: HandlerRequest,
        allowed: Vec<Method>,
    ) -> Result<HandlerResponse, DispatchError> {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let resp = match self.shared.method_not_allowed.load_full() {
            Some(fallback) => {
                req.extensions.insert(AllowedMethods(allowed));
                (fallback.handler)(req)?
            }
            None => None,
        };
        Ok(resp.unwrap_or_else(|| HandlerResponse::status_only(405).with_header("allow", allow)))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.scope.prefix())
            .field("host", &self.scope.host())
            .field("routes", &self.shared.routes.len())
            .field("cache", &self.shared.cache)
            .finish()
    }
}
