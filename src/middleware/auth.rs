use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::pipeline::Next;
use tracing::debug;

/// Static token check.
///
/// Compares one request header (default `authorization`) with a fixed token.
/// A `Bearer ` prefix on the header value is accepted. Requests that fail the
/// check get a 401 and never reach later stages.
pub struct AuthMiddleware {
    token: String,
    header: String,
}

impl AuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            header: "authorization".to_string(),
        }
    }

    /// Read the token from `header` instead of `authorization`.
    #[must_use]
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = header.to_ascii_lowercase();
        self
    }

    fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        let presented = value.strip_prefix("Bearer ").unwrap_or(value);
        presented == self.token
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        match req.get_header(&self.header).map(|v| self.accepts(v)) {
            Some(true) => next.run(req).map(Some),
            presented => {
                debug!(
                    method = %req.method,
                    path = %req.path,
                    header = %self.header,
                    present = presented.is_some(),
                    "Authentication failed"
                );
                Ok(Some(
                    HandlerResponse::error(401, "Unauthorized")
                        .with_header("www-authenticate", "Bearer"),
                ))
            }
        }
    }
}
