use crate::dispatcher::ParamVec;
use crate::error::RegistrationError;
use http::Method;
use std::fmt;

/// Identifier a [`PathMatcher`] hands out for each registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub usize);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of matching one request against the registered routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A route accepts this method, host and path.
    Matched {
        id: RouteId,
        /// Values of `{name}` placeholders in the host and path templates
        params: ParamVec,
    },
    /// Some route matches the host and path, but none accepts the method.
    MethodNotAllowed {
        /// Methods that would have matched, in registration order
        allowed: Vec<Method>,
    },
    /// Nothing matches.
    NotFound,
}

/// The path-matching collaborator the router delegates to.
///
/// The router owns pipelines, groups and middleware; the matcher only maps
/// `(method, host, path)` to a route id and keeps route names for reverse
/// lookup. Patterns passed in are already fully prefixed.
pub trait PathMatcher: Send + Sync {
    /// Register a route and return its id.
    fn register(
        &mut self,
        methods: &[Method],
        pattern: &str,
        host: Option<&str>,
    ) -> Result<RouteId, RegistrationError>;

    /// Find the route for a request.
    fn match_route(&self, method: &Method, host: Option<&str>, path: &str) -> MatchOutcome;

    /// Attach a name to a route; a name given twice points at the latest route.
    fn set_name(&mut self, id: RouteId, name: &str);

    /// Route registered under `name`.
    fn named(&self, name: &str) -> Option<RouteId>;
}
