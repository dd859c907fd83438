use super::{RouteGroup, Router};
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::error::RegistrationError;
use crate::middleware::{Middleware, MiddlewareSpec};
use crate::pipeline::Next;
use crate::runtime_config::RouterConfig;
use http::Method;

struct Tag(&'static str);

impl Middleware for Tag {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        next.run(req).map(Some)
    }

    fn name(&self) -> &str {
        self.0
    }
}

fn tag(label: &'static str) -> MiddlewareSpec {
    MiddlewareSpec::shared(Tag(label))
}

fn ok(_req: HandlerRequest) -> HandlerResult {
    Ok(None)
}

#[test]
fn test_chain_order_global_group_route() {
    let router = Router::new();
    router.use_middleware(tag("global"));
    let mut handle = None;
    router
        .group(RouteGroup::prefix("/outer"), |outer| {
            outer.use_middleware(tag("outer"));
            outer.group(RouteGroup::prefix("/inner"), |inner| {
                inner.use_middleware(tag("inner"));
                handle = Some(inner.get("/leaf", ok)?);
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let handle = handle.unwrap();
    handle.use_middleware(tag("route"));
    assert_eq!(handle.stage_names(), vec!["global", "outer", "inner", "route"]);
    assert_eq!(handle.info().pattern, "/outer/inner/leaf");
}

#[test]
fn test_group_use_after_builder_reaches_undispatched_routes() {
    let router = Router::new();
    let mut handle = None;
    let group = router
        .group(RouteGroup::prefix("/g"), |g| {
            handle = Some(g.get("/a", ok)?);
            Ok(())
        })
        .unwrap();
    group.use_middleware(tag("late"));
    assert_eq!(handle.unwrap().stage_names(), vec!["late"]);
}

#[test]
fn test_scope_use_after_first_dispatch_does_not_change_chain() {
    let router = Router::new();
    let handle = router.get("/a", ok).unwrap();
    router.dispatch(HandlerRequest::new(Method::GET, "/a")).unwrap();
    router.use_middleware(tag("late"));
    assert!(handle.stage_names().is_empty());

    // route-level use rebuilds from the current snapshot
    handle.use_middleware(tag("own"));
    assert_eq!(handle.stage_names(), vec!["late", "own"]);
}

#[test]
fn test_route_handle_debug_shows_route() {
    let router = Router::new();
    let handle = router.post("/orders/{id}", ok).unwrap();
    handle.use_middleware(tag("audit"));
    let shown = format!("{handle:?}");
    assert!(shown.contains("/orders/{id}"), "{shown}");
    assert!(shown.contains("POST"), "{shown}");
    assert!(shown.contains("own_middleware: 1"), "{shown}");
}

#[test]
fn test_empty_methods_rejected() {
    let router = Router::new();
    let err = router.route(&[], "/x", ok).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::EmptyMethods {
            path: "/x".to_string()
        }
    );
}

#[test]
fn test_invalid_pattern_surfaces_from_group_builder() {
    let router = Router::new();
    let err = router
        .group(RouteGroup::prefix("/g"), |g| {
            g.get("/{id", ok)?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidPattern { .. }));
    assert!(router.routes().is_empty());
}

#[test]
fn test_matcher_is_shared_by_scopes() {
    let router = Router::new();
    let group = router
        .group(RouteGroup::prefix("/api"), |api| {
            api.post("/items", ok)?;
            Ok(())
        })
        .unwrap();
    group.get("/items", ok).unwrap();

    let resp = router
        .dispatch(HandlerRequest::new(Method::PUT, "/api/items"))
        .unwrap();
    assert_eq!(resp.status, 405);
    assert_eq!(resp.get_header("allow"), Some("POST, GET"));
    assert_eq!(router.routes().len(), 2);
}

#[test]
fn test_strict_slash_from_config() {
    let router = Router::with_config(RouterConfig {
        strict_slash: true,
        ..RouterConfig::default()
    });
    router
        .get("/users", |_req| Ok(Some(HandlerResponse::text(200, "list"))))
        .unwrap();
    let resp = router
        .dispatch(HandlerRequest::new(Method::GET, "/users/"))
        .unwrap();
    assert_eq!(resp.status, 404);
    assert!(router.config().strict_slash);
}

#[test]
fn test_request_id_adopted_from_header() {
    let router = Router::new();
    router
        .get("/id", |req| {
            Ok(Some(HandlerResponse::text(200, req.request_id.to_string())))
        })
        .unwrap();
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let resp = router
        .dispatch(HandlerRequest::new(Method::GET, "/id").with_header("X-Request-Id", id))
        .unwrap();
    assert_eq!(resp.body, id);
}
