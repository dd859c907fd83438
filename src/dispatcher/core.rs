//! Request and response values carried through a dispatch.
//!
//! Parameters and headers use `SmallVec` so the common case (a handful of
//! each) stays off the heap.

use crate::ids::RequestId;
use crate::router::RouteInfo;
use http::{Extensions, Method};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum inline path/query parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated header storage.
///
/// Header names are `Arc<str>` because the same few names repeat on every
/// request and cloning them is an atomic increment.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Stack-allocated path/query parameter storage.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Outcome of a middleware stage or terminal handler.
///
/// `Ok(None)` means "no response"; the engine substitutes the default for the
/// current phase, so callers of dispatch never observe it.
pub type HandlerResult = Result<Option<HandlerResponse>, crate::error::DispatchError>;

/// An inbound request as seen by middleware and handlers.
///
/// Owned by exactly one dispatch. Middleware may rewrite it or attach derived
/// values through [`extensions`](Self::extensions) before passing it on; only
/// downstream stages and the terminal handler can observe those changes.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Explicit host; when `None` the `Host` header is used
    pub host: Option<String>,
    /// Parameters extracted from the path and host templates of the matched route
    pub path_params: ParamVec,
    /// Query string parameters
    pub query_params: ParamVec,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    /// Request-scoped values attached by middleware
    pub extensions: Extensions,
    /// The route this request was matched to, once matching has run
    pub route: Option<Arc<RouteInfo>>,
}

impl HandlerRequest {
    /// Build a request from a method and a request target (`/path?query`).
    ///
    /// The query string is split off and URL-decoded.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };
        let query_params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (Arc::<str>::from(k.as_ref()), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        let path = if path.is_empty() { "/" } else { path };

        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            host: None,
            path_params: ParamVec::new(),
            query_params,
            headers: HeaderVec::new(),
            body: None,
            extensions: Extensions::new(),
            route: None,
        }
    }

    /// Add a header (names are stored lowercase).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    /// Set the request host explicitly.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a name repeats.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?limit=10&limit=20` yields `20`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Host the request was addressed to, without any port.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        let raw = self.host.as_deref().or_else(|| self.get_header("host"))?;
        let raw = raw.trim();
        let host = if raw.starts_with('[') {
            // IPv6 literal: keep the brackets, drop the port
            raw.find(']').map_or(raw, |end| &raw[..=end])
        } else {
            raw.split(':').next().unwrap_or(raw)
        };
        (!host.is_empty()).then_some(host)
    }

    /// Replace the generated request id with the one carried in `header`, if it parses.
    pub(crate) fn adopt_request_id(&mut self, header: &str) {
        if let Some(value) = self.get_header(header) {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
    }
}

/// Response produced by a handler or middleware.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body; `Value::Null` means no body
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with a content-type header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a plain-text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, HeaderVec::new(), Value::String(body.into()))
    }

    /// Create a response with only a status code and an empty body
    #[must_use]
    pub fn status_only(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Value::Null)
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
    }

    /// Builder form of [`set_header`](Self::set_header).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }
}
