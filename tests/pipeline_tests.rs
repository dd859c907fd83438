mod common;

use common::{body_text, get, test_tracing};
use muxchain::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use muxchain::middleware::{Middleware, MiddlewareSpec};
use muxchain::pipeline::Next;
use muxchain::router::{RouteGroup, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

/// Appends its label before and after the rest of the chain.
struct Marker {
    label: &'static str,
    journal: Journal,
    calls: Arc<AtomicUsize>,
}

impl Marker {
    fn spec(label: &'static str, journal: &Journal) -> (MiddlewareSpec, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let marker = Marker {
            label,
            journal: Arc::clone(journal),
            calls: Arc::clone(&calls),
        };
        (MiddlewareSpec::shared(marker), calls)
    }
}

impl Middleware for Marker {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(format!("{}:in", self.label));
        let resp = next.run(req)?;
        self.journal.lock().unwrap().push(format!("{}:out", self.label));
        Ok(Some(resp))
    }
}

struct Gate;

impl Middleware for Gate {
    fn handle(&self, _req: HandlerRequest, _next: Next<'_>) -> HandlerResult {
        Ok(Some(HandlerResponse::error(403, "closed")))
    }
}

fn journaled_handler(journal: &Journal) -> impl Fn(HandlerRequest) -> HandlerResult + Send + Sync {
    let journal = Arc::clone(journal);
    move |_req| {
        journal.lock().unwrap().push("handler".to_string());
        Ok(Some(HandlerResponse::text(200, "done")))
    }
}

#[test]
fn test_stages_run_once_in_registration_order() {
    test_tracing::init();
    let journal: Journal = Arc::default();
    let router = Router::new();
    let (global, global_calls) = Marker::spec("global", &journal);
    let (group_mw, group_calls) = Marker::spec("group", &journal);
    let (route_mw, route_calls) = Marker::spec("route", &journal);

    router.use_middleware(global);
    router
        .group(RouteGroup::prefix("/g"), |g| {
            g.use_middleware(group_mw);
            g.get("/r", journaled_handler(&journal))?.use_middleware(route_mw);
            Ok(())
        })
        .unwrap();

    let resp = get(&router, "/g/r");
    assert_eq!(resp.status, 200);
    assert_eq!(body_text(&resp), "done");
    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "global:in",
            "group:in",
            "route:in",
            "handler",
            "route:out",
            "group:out",
            "global:out"
        ]
    );
    for calls in [&global_calls, &group_calls, &route_calls] {
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_short_circuit_stops_later_stages_and_handler() {
    test_tracing::init();
    let journal: Journal = Arc::default();
    let router = Router::new();
    let (first, first_calls) = Marker::spec("first", &journal);
    let (after, after_calls) = Marker::spec("after", &journal);
    let handler_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handler_calls);

    router.use_middlewares([first, MiddlewareSpec::shared(Gate), after]);
    router
        .get("/blocked", move |_req| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .unwrap();

    let resp = get(&router, "/blocked");
    assert_eq!(resp.status, 403);
    assert_eq!(resp.body["error"], "closed");
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    // the outer stage still sees the response on the way out
    assert_eq!(*journal.lock().unwrap(), vec!["first:in", "first:out"]);
}

#[derive(Debug, Clone, PartialEq)]
struct Tenant(String);

#[test]
fn test_request_augmentation_visible_downstream_only() {
    test_tracing::init();
    let router = Router::new();
    router.use_middleware(MiddlewareSpec::from_fn(|mut req, next| {
        let tenant = req.get_header("x-tenant").unwrap_or("public").to_string();
        req.extensions.insert(Tenant(tenant));
        next.run(req).map(Some)
    }));
    router
        .get("/whoami", |req| {
            let tenant = req
                .extensions
                .get::<Tenant>()
                .map(|t| t.0.clone())
                .unwrap_or_default();
            Ok(Some(HandlerResponse::text(200, tenant)))
        })
        .unwrap();

    let resp = router
        .dispatch(HandlerRequest::new(http::Method::GET, "/whoami").with_header("X-Tenant", "acme"))
        .unwrap();
    assert_eq!(body_text(&resp), "acme");
    assert_eq!(body_text(&get(&router, "/whoami")), "public");
}

#[test]
fn test_post_processing_header() {
    test_tracing::init();
    let router = Router::new();
    router.use_middleware(MiddlewareSpec::from_fn(|req, next| {
        let mut resp = next.run(req)?;
        resp.set_header("x-powered-by", "muxchain");
        Ok(Some(resp))
    }));
    router.get("/", |_req| Ok(None)).unwrap();

    let resp = get(&router, "/");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.get_header("x-powered-by"), Some("muxchain"));
}

#[test]
fn test_absent_response_from_middleware_becomes_200() {
    test_tracing::init();
    let router = Router::new();
    router.use_middleware(MiddlewareSpec::from_fn(|_req, _next| Ok(None)));
    router
        .get("/", |_req| Ok(Some(HandlerResponse::text(201, "never"))))
        .unwrap();

    let resp = get(&router, "/");
    assert_eq!(resp.status, 200);
    assert!(resp.body.is_null());
}

#[test]
fn test_handler_error_is_a_dispatch_error() {
    test_tracing::init();
    let router = Router::new();
    router
        .get("/fail", |_req| Err(anyhow::anyhow!("database unavailable").into()))
        .unwrap();

    let err = router
        .dispatch(HandlerRequest::new(http::Method::GET, "/fail"))
        .unwrap_err();
    assert!(err.to_string().contains("database unavailable"));
}
