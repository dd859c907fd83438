use super::lifecycle::{Action, Construct};
use crate::dispatcher::HandlerRequest;
use crate::middleware::Middleware;
use crate::router::Controller;
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a fresh, constructed middleware instance for one request.
pub struct MiddlewareConstructor {
    type_name: &'static str,
    build: fn(&HandlerRequest) -> Box<dyn Middleware>,
}

impl MiddlewareConstructor {
    /// Create a blank instance and run its lifecycle hook against `req`.
    pub fn instantiate(&self, req: &HandlerRequest) -> Box<dyn Middleware> {
        (self.build)(req)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for MiddlewareConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConstructor")
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn build_constructed<M>(req: &HandlerRequest) -> Box<dyn Middleware>
where
    M: Middleware + Construct + Default,
{
    let mut instance = M::default();
    instance.construct(req);
    Box::new(instance)
}

/// Cached metadata for one controller type.
///
/// The action table is read once per type; individual action handles are
/// copied into `methods` the first time each name is asked for.
pub struct ControllerEntry<C> {
    type_name: &'static str,
    table: Vec<(&'static str, Action<C>)>,
    methods: DashMap<&'static str, Action<C>>,
}

impl<C> ControllerEntry<C> {
    /// Locate the action registered under `name`.
    pub fn action(&self, name: &str) -> Option<Action<C>> {
        if let Some(action) = self.methods.get(name) {
            return Some(*action);
        }
        let (key, action) = self.table.iter().find(|(n, _)| *n == name)?;
        let action = *self.methods.entry(*key).or_insert(*action);
        debug!(
            controller = self.type_name,
            action = *key,
            "Controller action handle cached"
        );
        Some(action)
    }

    /// Number of action handles located so far.
    pub fn cached_actions(&self) -> usize {
        self.methods.len()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Component Descriptor Cache.
///
/// Maps a component's type identity to what is needed to instantiate and
/// invoke it. Entries are created with a sharded `entry().or_insert_with`, so
/// concurrent first lookups of the same type agree on a single winner and
/// lookups of different types never contend on one lock. Entries are never
/// evicted; their number is bounded by the component types a program registers.
#[derive(Default)]
pub struct ComponentCache {
    middleware: DashMap<TypeId, Arc<MiddlewareConstructor>>,
    controllers: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    scans: AtomicUsize,
    hits: AtomicUsize,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructor handle for a per-request middleware type.
    pub fn middleware_constructor<M>(&self) -> Arc<MiddlewareConstructor>
    where
        M: Middleware + Construct + Default,
    {
        let key = TypeId::of::<M>();
        if let Some(existing) = self.middleware.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(existing.value());
        }

        let mut populated = false;
        let constructor = {
            let entry = self.middleware.entry(key).or_insert_with(|| {
                populated = true;
                Arc::new(MiddlewareConstructor {
                    type_name: type_name::<M>(),
                    build: build_constructed::<M>,
                })
            });
            Arc::clone(entry.value())
        };

        // The shard guard is released here; `len()` locks every shard.
        if populated {
            self.scans.fetch_add(1, Ordering::Relaxed);
            info!(
                middleware = type_name::<M>(),
                cache_size = self.middleware.len(),
                "Middleware constructor cached"
            );
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        constructor
    }

    /// Metadata entry for a controller type.
    pub fn controller_entry<C: Controller>(&self) -> Arc<ControllerEntry<C>> {
        let key = TypeId::of::<C>();
        let erased = match self.controllers.get(&key) {
            Some(existing) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Arc::clone(existing.value())
            }
            None => {
                let mut scanned = None;
                let erased = {
                    let entry = self.controllers.entry(key).or_insert_with(|| {
                        let table = C::actions();
                        scanned = Some(table.len());
                        Arc::new(ControllerEntry {
                            type_name: type_name::<C>(),
                            table,
                            methods: DashMap::new(),
                        })
                    });
                    Arc::clone(entry.value())
                };
                match scanned {
                    Some(actions) => {
                        self.scans.fetch_add(1, Ordering::Relaxed);
                        info!(
                            controller = type_name::<C>(),
                            actions,
                            cache_size = self.controllers.len(),
                            "Controller action table cached"
                        );
                    }
                    None => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                    }
                }
                erased
            }
        };

        match erased.downcast::<ControllerEntry<C>>() {
            Ok(entry) => entry,
            Err(_) => {
                // Keyed by TypeId, so this only happens if the map was corrupted.
                warn!(
                    controller = type_name::<C>(),
                    "Controller cache entry had an unexpected type; rebuilding uncached"
                );
                Arc::new(ControllerEntry {
                    type_name: type_name::<C>(),
                    table: C::actions(),
                    methods: DashMap::new(),
                })
            }
        }
    }

    /// Number of type scans performed (cache misses).
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cached component types.
    pub fn len(&self) -> usize {
        self.middleware.len() + self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ComponentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCache")
            .field("middleware", &self.middleware.len())
            .field("controllers", &self.controllers.len())
            .field("scans", &self.scans())
            .field("hits", &self.hits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{HandlerResponse, HandlerResult};
    use crate::pipeline::Next;
    use crate::router::RouteGroup;
    use http::Method;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Stamp {
        path: String,
    }

    impl Construct for Stamp {
        fn construct(&mut self, req: &HandlerRequest) {
            self.path = req.path.clone();
        }
    }

    impl Middleware for Stamp {
        fn handle(&self, _req: HandlerRequest, _next: Next<'_>) -> HandlerResult {
            Ok(Some(HandlerResponse::text(200, self.path.clone())))
        }
    }

    struct Pages;

    impl Pages {
        fn list(&self, _req: HandlerRequest) -> HandlerResult {
            Ok(None)
        }
    }

    impl Controller for Pages {
        fn route_group(&self) -> RouteGroup {
            RouteGroup::prefix("/pages")
        }

        fn actions() -> Vec<(&'static str, Action<Self>)> {
            vec![("list", Pages::list)]
        }
    }

    #[test]
    fn test_middleware_constructor_is_cached() {
        let cache = ComponentCache::new();
        let first = cache.middleware_constructor::<Stamp>();
        let second = cache.middleware_constructor::<Stamp>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.scans(), 1);
        assert_eq!(cache.hits(), 1);
        assert!(first.type_name().ends_with("Stamp"));
    }

    #[test]
    fn test_constructor_runs_hook_per_instance() {
        let cache = ComponentCache::new();
        let ctor = cache.middleware_constructor::<Stamp>();
        let a = ctor.instantiate(&HandlerRequest::new(Method::GET, "/a"));
        let b = ctor.instantiate(&HandlerRequest::new(Method::GET, "/b"));
        assert!(a.name().ends_with("Stamp"));
        assert!(b.name().ends_with("Stamp"));
    }

    #[test]
    fn test_controller_entry_scans_once() {
        let cache = ComponentCache::new();
        let first = cache.controller_entry::<Pages>();
        let second = cache.controller_entry::<Pages>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.scans(), 1);

        assert!(first.action("list").is_some());
        assert!(second.action("list").is_some());
        assert_eq!(first.cached_actions(), 1);
        assert!(first.action("missing").is_none());
        assert_eq!(first.cached_actions(), 1);
    }

    /// Run `f` on its own thread with an INFO subscriber installed, failing
    /// instead of hanging if it does not return.
    fn within_info_logging<T, F>(f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::INFO)
                .with_test_writer()
                .finish();
            let result = tracing::subscriber::with_default(subscriber, f);
            tx.send(result).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("cache lookup did not finish with INFO logging enabled")
    }

    #[test]
    fn test_first_middleware_lookup_with_info_logging() {
        let (same, scans, hits) = within_info_logging(|| {
            let cache = ComponentCache::new();
            let first = cache.middleware_constructor::<Stamp>();
            let second = cache.middleware_constructor::<Stamp>();
            (Arc::ptr_eq(&first, &second), cache.scans(), cache.hits())
        });
        assert!(same);
        assert_eq!((scans, hits), (1, 1));
    }

    #[test]
    fn test_first_controller_lookup_with_info_logging() {
        let (scans, actions) = within_info_logging(|| {
            let cache = ComponentCache::new();
            let entry = cache.controller_entry::<Pages>();
            cache.controller_entry::<Pages>();
            (cache.scans(), entry.action("list").is_some())
        });
        assert_eq!(scans, 1);
        assert!(actions);
    }

    #[test]
    fn test_concurrent_first_lookup_has_single_winner() {
        let cache = ComponentCache::new();
        let handles: Vec<Arc<MiddlewareConstructor>> = thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.middleware_constructor::<Stamp>()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(cache.scans(), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
