use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResult};
use crate::pipeline::Next;

const UNMATCHED: &str = "<unmatched>";

/// Middleware for collecting request metrics
///
/// Counters are atomics and the per-status/per-route tables are sharded maps,
/// so concurrent dispatches never serialize on a single lock. Register it with
/// [`MiddlewareSpec::shared_arc`](super::MiddlewareSpec::shared_arc) and keep
/// the `Arc` to read the numbers back.
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    failures: AtomicUsize,
    by_status: DashMap<u16, usize>,
    by_route: DashMap<String, usize>,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests that passed this stage
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean time spent in the rest of the chain.
    ///
    /// Returns zero if no requests have been processed yet.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Requests whose downstream chain returned an error instead of a response.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Number of responses with `status`.
    pub fn status_count(&self, status: u16) -> usize {
        self.by_status.get(&status).map_or(0, |c| *c)
    }

    /// Number of requests matched to the route registered as `pattern`.
    pub fn route_count(&self, pattern: &str) -> usize {
        self.by_route.get(pattern).map_or(0, |c| *c)
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let route = req
            .route
            .as_ref()
            .map_or_else(|| UNMATCHED.to_string(), |r| r.pattern.clone());
        *self.by_route.entry(route).or_insert(0) += 1;

        let start = Instant::now();
        let outcome = next.run(req);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);

        match outcome {
            Ok(resp) => {
                *self.by_status.entry(resp.status).or_insert(0) += 1;
                Ok(Some(resp))
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
