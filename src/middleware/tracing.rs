use std::time::Instant;

use tracing::{field, info_span, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResult};
use crate::pipeline::Next;
use crate::runtime_config::{RouterConfig, DEFAULT_REQUEST_ID_HEADER};

/// Opens a `request` span around the rest of the chain.
///
/// The span carries method, path, matched route and request id; status and
/// latency are recorded on the way out. The request id is echoed back in the
/// configured request-id header.
pub struct TracingMiddleware {
    request_id_header: String,
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self {
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl TracingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo the request id in the header named by `config`.
    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            request_id_header: config.request_id_header.to_ascii_lowercase(),
        }
    }
}

impl Middleware for TracingMiddleware {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        let route = req.route.as_ref().map(|r| r.pattern.as_str()).unwrap_or("");
        let span = info_span!(
            "request",
            method = %req.method,
            path = %req.path,
            route = %route,
            request_id = %req.request_id,
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let request_id = req.request_id;
        let start = Instant::now();

        let outcome = span.in_scope(|| next.run(req));
        span.record("latency_ms", start.elapsed().as_millis() as u64);

        match outcome {
            Ok(mut resp) => {
                span.record("status", resp.status);
                resp.set_header(&self.request_id_header, request_id.to_string());
                Ok(Some(resp))
            }
            Err(e) => {
                span.in_scope(|| warn!(error = %e, "Request failed"));
                Err(e)
            }
        }
    }
}
