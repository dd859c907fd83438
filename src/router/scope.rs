use crate::pipeline::MiddlewareDescriptor;
use parking_lot::RwLock;

/// Prefix and host shared by every route registered under a group.
///
/// Both parts are optional. Empty strings mean "none".
///
/// ```rust
/// use muxchain::router::RouteGroup;
///
/// let group = RouteGroup::prefix("/api/").with_host("{tenant}.example.com");
/// assert_eq!(group.prefix, "/api");
/// assert_eq!(group.host, "{tenant}.example.com");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGroup {
    pub prefix: String,
    pub host: String,
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl RouteGroup {
    pub fn new(prefix: &str, host: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            host: host.trim().to_string(),
        }
    }

    /// Group with a path prefix only.
    pub fn prefix(prefix: &str) -> Self {
        Self::new(prefix, "")
    }

    /// Group with a host template only.
    pub fn host(host: &str) -> Self {
        Self::new("", host)
    }

    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim().to_string();
        self
    }
}

/// Registration scope: the router root or one group.
///
/// `inherited` is the parent's effective middleware list copied when this
/// scope was created; later additions to the parent do not reach it.
pub(crate) struct Scope {
    prefix: String,
    host: Option<String>,
    inherited: Vec<MiddlewareDescriptor>,
    own: RwLock<Vec<MiddlewareDescriptor>>,
}

impl Scope {
    pub(crate) fn root() -> Self {
        Self {
            prefix: String::new(),
            host: None,
            inherited: Vec::new(),
            own: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn child(&self, group: &RouteGroup) -> Self {
        let prefix = normalize_prefix(&group.prefix);
        let host = group.host.trim();
        Self {
            prefix: format!("{}{}", self.prefix, prefix),
            host: if host.is_empty() {
                self.host.clone()
            } else {
                Some(host.to_string())
            },
            inherited: self.effective(),
            own: RwLock::new(Vec::new()),
        }
    }

    /// Inherited list followed by this scope's own list.
    pub(crate) fn effective(&self) -> Vec<MiddlewareDescriptor> {
        let own = self.own.read();
        let mut list = Vec::with_capacity(self.inherited.len() + own.len());
        list.extend(self.inherited.iter().cloned());
        list.extend(own.iter().cloned());
        list
    }

    pub(crate) fn append(&self, descriptor: MiddlewareDescriptor) {
        self.own.write().push(descriptor);
    }

    /// Join this scope's prefix with a route path.
    pub(crate) fn full_path(&self, path: &str) -> String {
        let path = path.trim();
        match (self.prefix.is_empty(), path.is_empty()) {
            (true, true) => "/".to_string(),
            (false, true) => self.prefix.clone(),
            (_, false) if path.starts_with('/') => format!("{}{}", self.prefix, path),
            _ => format!("{}/{}", self.prefix, path),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}
