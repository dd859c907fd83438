mod common;

use common::{body_text, test_tracing};
use http::Method;
use muxchain::components::{Action, Construct, Lifecycle};
use muxchain::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use muxchain::middleware::{MetricsMiddleware, Middleware, MiddlewareSpec};
use muxchain::pipeline::Next;
use muxchain::router::{Controller, RouteGroup, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

/// Captures the caller and a construction instant, then holds the request
/// long enough for other dispatches to interleave.
#[derive(Default)]
struct Snapshot {
    caller: String,
    serial: usize,
    built_at: Option<Instant>,
}

impl Construct for Snapshot {
    fn construct(&mut self, req: &HandlerRequest) {
        self.caller = req.get_header("x-caller").unwrap_or_default().to_string();
        self.serial = CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        self.built_at = Some(Instant::now());
    }
}

impl Middleware for Snapshot {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        thread::sleep(Duration::from_millis(2));
        let mut resp = next.run(req)?;
        resp.set_header("x-seen-caller", self.caller.clone());
        resp.set_header("x-serial", self.serial.to_string());
        resp.set_header("x-has-instant", self.built_at.is_some().to_string());
        Ok(Some(resp))
    }
}

#[test]
fn test_constructible_middleware_is_isolated_per_request() {
    test_tracing::init();
    let router = Router::new();
    router.use_middleware(MiddlewareSpec::per_request::<Snapshot>());
    router
        .get("/who", |req| {
            let caller = req.get_header("x-caller").unwrap_or_default().to_string();
            Ok(Some(HandlerResponse::text(200, caller)))
        })
        .unwrap();

    const THREADS: usize = 16;
    const PER_THREAD: usize = 20;
    let barrier = Barrier::new(THREADS);
    let serials: Vec<Vec<String>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let router = &router;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    let mut seen = Vec::new();
                    for i in 0..PER_THREAD {
                        let caller = format!("{t}-{i}");
                        let resp = router
                            .dispatch(
                                HandlerRequest::new(Method::GET, "/who")
                                    .with_header("X-Caller", caller.clone()),
                            )
                            .unwrap();
                        assert_eq!(body_text(&resp), caller);
                        assert_eq!(resp.get_header("x-seen-caller"), Some(caller.as_str()));
                        assert_eq!(resp.get_header("x-has-instant"), Some("true"));
                        seen.push(resp.get_header("x-serial").unwrap_or_default().to_string());
                    }
                    seen
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    // every request got its own instance
    let mut all: Vec<String> = serials.into_iter().flatten().collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), THREADS * PER_THREAD);
    assert_eq!(router.cache().scans(), 1);
}

#[derive(Default)]
struct Cart {
    owner: String,
}

impl Construct for Cart {
    fn construct(&mut self, req: &HandlerRequest) {
        self.owner = req.get_query_param("owner").unwrap_or_default().to_string();
    }
}

impl Cart {
    fn view(&self, _req: HandlerRequest) -> HandlerResult {
        thread::sleep(Duration::from_millis(1));
        Ok(Some(HandlerResponse::text(200, self.owner.clone())))
    }
}

impl Controller for Cart {
    fn route_group(&self) -> RouteGroup {
        RouteGroup::prefix("/cart")
    }

    fn actions() -> Vec<(&'static str, Action<Self>)> {
        vec![("view", Self::view)]
    }

    fn lifecycle(&self) -> Lifecycle<Self> {
        Lifecycle::per_request()
    }
}

#[test]
fn test_per_request_controller_under_concurrency() {
    test_tracing::init();
    let router = Router::new();
    router
        .controller(Cart::default(), |c| {
            c.get_action("", "view")?;
            Ok(())
        })
        .unwrap();

    thread::scope(|s| {
        for t in 0..8 {
            let router = &router;
            s.spawn(move || {
                for i in 0..25 {
                    let owner = format!("user{t}x{i}");
                    let resp = router
                        .dispatch(HandlerRequest::new(Method::GET, &format!("/cart?owner={owner}")))
                        .unwrap();
                    assert_eq!(body_text(&resp), owner);
                }
            });
        }
    });
}

#[test]
fn test_concurrent_dispatch_builds_one_consistent_chain() {
    test_tracing::init();
    let metrics = Arc::new(MetricsMiddleware::new());
    let router = Router::new();
    router.use_middleware(MiddlewareSpec::shared_arc(Arc::clone(&metrics)));
    let handle = router.get("/hot", |_req| Ok(None)).unwrap();

    let barrier = Barrier::new(8);
    thread::scope(|s| {
        for _ in 0..8 {
            let router = &router;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    assert_eq!(common::get(router, "/hot").status, 200);
                }
            });
        }
    });

    assert_eq!(metrics.request_count(), 400);
    assert_eq!(metrics.status_count(200), 400);
    assert_eq!(handle.stage_names().len(), 1);
}

#[derive(Default)]
struct A;
#[derive(Default)]
struct B;
#[derive(Default)]
struct C;

macro_rules! passthrough {
    ($($t:ty),*) => {$(
        impl Construct for $t {
            fn construct(&mut self, _req: &HandlerRequest) {}
        }
        impl Middleware for $t {
            fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
                next.run(req).map(Some)
            }
        }
    )*};
}

passthrough!(A, B, C);

#[test]
fn test_concurrent_first_lookups_of_distinct_types() {
    test_tracing::init();
    let router = Router::new();
    let barrier = Barrier::new(12);
    thread::scope(|s| {
        for i in 0..12 {
            let cache = router.cache();
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                match i % 3 {
                    0 => cache.middleware_constructor::<A>(),
                    1 => cache.middleware_constructor::<B>(),
                    _ => cache.middleware_constructor::<C>(),
                }
            });
        }
    });

    assert_eq!(router.cache().scans(), 3);
    assert_eq!(router.cache().len(), 3);
}
