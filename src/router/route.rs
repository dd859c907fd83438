use super::core::RouterShared;
use super::matcher::RouteId;
use super::scope::Scope;
use crate::middleware::MiddlewareSpec;
use crate::pipeline::{HandlerFn, MiddlewareDescriptor, Pipeline};
use arc_swap::ArcSwapOption;
use http::Method;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a registered route looks like from the outside.
///
/// Handlers see the matched route through [`HandlerRequest::route`](crate::dispatcher::HandlerRequest::route).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub id: RouteId,
    pub methods: Vec<Method>,
    /// Full path template including group prefixes
    pub pattern: String,
    /// Host template, if the route or one of its groups set one
    pub host: Option<String>,
}

impl RouteInfo {
    /// Build a concrete path by substituting `{name}` placeholders.
    ///
    /// Values are percent-encoded. Returns `None` if a placeholder has no value.
    pub fn url(&self, params: &[(&str, &str)]) -> Option<String> {
        let mut out = String::with_capacity(self.pattern.len());
        for (i, segment) in self.pattern.split('/').enumerate() {
            if i > 0 {
                out.push('/');
            }
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(inner) => {
                    let name = inner.split_once(':').map_or(inner, |(n, _)| n).trim();
                    let (_, value) = params.iter().rev().find(|(k, _)| *k == name)?;
                    out.push_str(&urlencoding::encode(value));
                }
                None => out.push_str(segment),
            }
        }
        Some(out)
    }
}

/// A registered route: its handler, its scope and its own middleware.
pub(crate) struct RouteNode {
    pub(crate) info: Arc<RouteInfo>,
    scope: Arc<Scope>,
    handler: HandlerFn,
    own: RwLock<Vec<MiddlewareDescriptor>>,
    chain: ArcSwapOption<Pipeline>,
}

impl RouteNode {
    pub(crate) fn new(info: Arc<RouteInfo>, scope: Arc<Scope>, handler: HandlerFn) -> Self {
        Self {
            info,
            scope,
            handler,
            own: RwLock::new(Vec::new()),
            chain: ArcSwapOption::empty(),
        }
    }

    fn build(&self, own: &[MiddlewareDescriptor]) -> Pipeline {
        let mut stages = self.scope.effective();
        stages.extend(own.iter().cloned());
        debug!(
            route = %self.info.pattern,
            stages = stages.len(),
            "Dispatch chain built"
        );
        Pipeline::build(stages, Arc::clone(&self.handler))
    }

    /// The current chain, building it on first use.
    pub(crate) fn pipeline(&self) -> Arc<Pipeline> {
        if let Some(chain) = self.chain.load_full() {
            return chain;
        }
        let built = Arc::new(self.build(&self.own.read()));
        // Keep whatever another thread stored first
        let previous = self.chain.rcu(|current| match current {
            Some(existing) => Some(Arc::clone(existing)),
            None => Some(Arc::clone(&built)),
        });
        previous.unwrap_or(built)
    }

    /// Append route-local middleware and swap in a rebuilt chain.
    fn push_and_rebuild(&self, descriptors: Vec<MiddlewareDescriptor>) {
        let mut own = self.own.write();
        own.extend(descriptors);
        let rebuilt = Arc::new(self.build(&own));
        self.chain.store(Some(rebuilt));
    }
}

/// Handle returned by route registration.
pub struct RouteHandle {
    pub(crate) node: Arc<RouteNode>,
    pub(crate) shared: Arc<RouterShared>,
}

impl RouteHandle {
    /// Name the route for [`Router::route_named`](super::Router::route_named)
    /// and [`Router::url_for`](super::Router::url_for).
    pub fn name(&self, name: &str) -> &Self {
        self.shared.matcher.write().set_name(self.node.info.id, name);
        self
    }

    /// Add route-local middleware. The next request to this route runs the
    /// rebuilt chain.
    pub fn use_middleware(&self, spec: MiddlewareSpec) -> &Self {
        self.use_middlewares([spec])
    }

    pub fn use_middlewares(&self, specs: impl IntoIterator<Item = MiddlewareSpec>) -> &Self {
        let descriptors = specs
            .into_iter()
            .map(|s| s.resolve(&self.shared.cache))
            .collect();
        self.node.push_and_rebuild(descriptors);
        self
    }

    pub fn info(&self) -> Arc<RouteInfo> {
        Arc::clone(&self.node.info)
    }

    /// Middleware names in the order a request to this route runs them.
    pub fn stage_names(&self) -> Vec<String> {
        self.node
            .pipeline()
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Debug for RouteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandle")
            .field("id", &self.node.info.id)
            .field("methods", &self.node.info.methods)
            .field("pattern", &self.node.info.pattern)
            .field("host", &self.node.info.host)
            .field("own_middleware", &self.node.own.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pattern: &str) -> RouteInfo {
        RouteInfo {
            id: RouteId(0),
            methods: vec![Method::GET],
            pattern: pattern.to_string(),
            host: None,
        }
    }

    #[test]
    fn test_url_fills_placeholders() {
        let route = info("/users/{id}/posts/{post:[0-9]+}");
        assert_eq!(
            route.url(&[("id", "a b"), ("post", "9")]).as_deref(),
            Some("/users/a%20b/posts/9")
        );
        assert_eq!(route.url(&[("id", "1")]), None);
        assert_eq!(info("/").url(&[]).as_deref(), Some("/"));
    }
}
