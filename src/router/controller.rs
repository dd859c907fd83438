use super::core::Router;
use super::route::RouteHandle;
use super::scope::RouteGroup;
use crate::components::{Action, ControllerEntry, Lifecycle};
use crate::dispatcher::HandlerRequest;
use crate::error::RegistrationError;
use crate::pipeline::HandlerFn;
use http::Method;
use std::ops::Deref;
use std::sync::Arc;

/// A value grouping related route handlers.
///
/// ```rust
/// use muxchain::components::{Action, Construct, Lifecycle};
/// use muxchain::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
/// use muxchain::router::{Controller, RouteGroup, Router};
///
/// #[derive(Default)]
/// struct Pages {
///     page: u32,
/// }
///
/// impl Construct for Pages {
///     fn construct(&mut self, req: &HandlerRequest) {
///         self.page = req.get_query_param("page").and_then(|p| p.parse().ok()).unwrap_or(1);
///     }
/// }
///
/// impl Pages {
///     fn list(&self, _req: HandlerRequest) -> HandlerResult {
///         Ok(Some(HandlerResponse::text(200, self.page.to_string())))
///     }
/// }
///
/// impl Controller for Pages {
///     fn route_group(&self) -> RouteGroup {
///         RouteGroup::prefix("/pages")
///     }
///     fn actions() -> Vec<(&'static str, Action<Self>)> {
///         vec![("list", Pages::list)]
///     }
///     fn lifecycle(&self) -> Lifecycle<Self> {
///         Lifecycle::per_request()
///     }
/// }
///
/// let router = Router::new();
/// router
///     .controller(Pages::default(), |c| {
///         c.get_action("", "list")?;
///         Ok(())
///     })
///     .unwrap();
/// ```
pub trait Controller: Send + Sync + Sized + 'static {
    /// Prefix and host for every route this controller registers.
    fn route_group(&self) -> RouteGroup;

    /// Action table: the methods that can be bound by name.
    fn actions() -> Vec<(&'static str, Action<Self>)>;

    /// Whether one value serves all requests or a fresh one is built per request.
    fn lifecycle(&self) -> Lifecycle<Self> {
        Lifecycle::Shared
    }
}

enum Binding<C> {
    Shared(Arc<C>),
    PerRequest {
        blank: fn() -> C,
        construct: fn(&mut C, &HandlerRequest),
    },
}

/// Registration scope handed to the [`Router::controller`] builder.
///
/// Derefs to the controller's group [`Router`], so plain handlers and
/// middleware register as usual. Named actions go through [`action`](Self::action)
/// and its verb helpers, which wrap them according to the controller's lifecycle.
pub struct ControllerScope<C: Controller> {
    router: Router,
    binding: Binding<C>,
    entry: Arc<ControllerEntry<C>>,
}

impl<C: Controller> ControllerScope<C> {
    pub(crate) fn bind(router: &Router, controller: C) -> Result<Self, RegistrationError> {
        let binding = match controller.lifecycle() {
            Lifecycle::Shared => None,
            Lifecycle::PerRequest {
                blank: Some(blank),
                construct,
            } => Some(Binding::PerRequest { blank, construct }),
            Lifecycle::PerRequest { blank: None, .. } => {
                return Err(RegistrationError::NotInstantiable {
                    controller: std::any::type_name::<C>(),
                })
            }
        };
        let group = controller.route_group();
        let binding = binding.unwrap_or_else(|| Binding::Shared(Arc::new(controller)));
        Ok(Self {
            router: router.child(&group),
            binding,
            entry: router.cache().controller_entry::<C>(),
        })
    }

    pub(crate) fn into_router(self) -> Router {
        self.router
    }

    pub fn is_per_request(&self) -> bool {
        matches!(self.binding, Binding::PerRequest { .. })
    }

    /// Register the action `name` for `methods` at `path`.
    pub fn action(
        &self,
        methods: &[Method],
        path: &str,
        name: &str,
    ) -> Result<RouteHandle, RegistrationError> {
        let action = self
            .entry
            .action(name)
            .ok_or_else(|| RegistrationError::UnknownAction {
                controller: self.entry.type_name(),
                action: name.to_string(),
            })?;

        let handler: HandlerFn = match &self.binding {
            Binding::Shared(controller) => {
                let controller = Arc::clone(controller);
                Arc::new(move |req| action(controller.as_ref(), req))
            }
            Binding::PerRequest { blank, construct } => {
                let (blank, construct) = (*blank, *construct);
                Arc::new(move |req| {
                    let mut controller = blank();
                    construct(&mut controller, &req);
                    action(&controller, req)
                })
            }
        };
        self.router.register(methods, path, handler)
    }

    pub fn get_action(&self, path: &str, name: &str) -> Result<RouteHandle, RegistrationError> {
        self.action(&[Method::GET], path, name)
    }

    pub fn post_action(&self, path: &str, name: &str) -> Result<RouteHandle, RegistrationError> {
        self.action(&[Method::POST], path, name)
    }

    pub fn put_action(&self, path: &str, name: &str) -> Result<RouteHandle, RegistrationError> {
        self.action(&[Method::PUT], path, name)
    }

    pub fn patch_action(&self, path: &str, name: &str) -> Result<RouteHandle, RegistrationError> {
        self.action(&[Method::PATCH], path, name)
    }

    pub fn delete_action(&self, path: &str, name: &str) -> Result<RouteHandle, RegistrationError> {
        self.action(&[Method::DELETE], path, name)
    }
}

impl<C: Controller> Deref for ControllerScope<C> {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}
