use crate::dispatcher::{HandlerRequest, HandlerResult};

/// Per-request lifecycle hook.
///
/// A component implementing `Construct` (together with `Default` as its
/// blank-instance factory) is rebuilt for every request that passes through
/// it: a fresh `Default` value is created and `construct` is called with the
/// request as it looks at that point in the chain, including anything earlier
/// stages attached.
pub trait Construct {
    /// Populate request-derived state on a freshly created instance.
    fn construct(&mut self, req: &HandlerRequest);
}

/// A controller method bound by name through [`Controller::actions`](crate::router::Controller::actions).
pub type Action<C> = fn(&C, HandlerRequest) -> HandlerResult;

/// How a controller is instantiated for each request.
pub enum Lifecycle<C> {
    /// The registered value serves every request.
    Shared,
    /// A new instance is built per request and `construct` runs before the action.
    PerRequest {
        /// Factory for a blank instance; `None` means the controller cannot be
        /// instantiated per request and attaching it is a registration error.
        blank: Option<fn() -> C>,
        /// Lifecycle hook run against the fresh instance.
        construct: fn(&mut C, &HandlerRequest),
    },
}

impl<C> Lifecycle<C> {
    /// Per-request lifecycle built from `Default` and [`Construct`].
    pub fn per_request() -> Self
    where
        C: Construct + Default,
    {
        Lifecycle::PerRequest {
            blank: Some(C::default),
            construct: C::construct,
        }
    }

    pub fn is_per_request(&self) -> bool {
        matches!(self, Lifecycle::PerRequest { .. })
    }
}
