//! Error taxonomy for registration and dispatch.
//!
//! Registration problems surface when the offending call is made, never later
//! at request time. Dispatch failures are whatever a stage or handler could not
//! recover from; turning them into responses is the job of
//! [`RecoveryMiddleware`](crate::middleware::RecoveryMiddleware), not the engine.

use std::fmt;

/// Error raised while registering routes, groups or controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The controller declares a per-request lifecycle but provides no way to
    /// build a fresh blank instance.
    NotInstantiable {
        /// Type name of the offending controller
        controller: &'static str,
    },
    /// An action name was bound that the controller's action table does not list.
    UnknownAction {
        /// Type name of the controller
        controller: &'static str,
        /// The requested action name
        action: String,
    },
    /// A path or host template could not be compiled.
    InvalidPattern {
        /// The template as given
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
    /// A route was registered without any HTTP method.
    EmptyMethods {
        /// Path template of the route
        path: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::NotInstantiable { controller } => write!(
                f,
                "controller {controller} declares a per-request lifecycle but cannot be \
                 instantiated per request (no blank-instance factory)"
            ),
            RegistrationError::UnknownAction { controller, action } => write!(
                f,
                "controller {controller} has no action named '{action}' in its action table"
            ),
            RegistrationError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route template '{pattern}': {reason}")
            }
            RegistrationError::EmptyMethods { path } => {
                write!(f, "route '{path}' was registered without any HTTP method")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Fatal failure while dispatching a single request.
#[derive(Debug)]
pub enum DispatchError {
    /// A middleware stage or terminal handler failed and nothing recovered it.
    Handler(anyhow::Error),
    /// Writing the response to the output sink failed.
    Io(std::io::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Handler(e) => write!(f, "request handling failed: {e:#}"),
            DispatchError::Io(e) => write!(f, "failed to write response: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Handler(e) => Some(e.as_ref()),
            DispatchError::Io(e) => Some(e),
        }
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(e: anyhow::Error) -> Self {
        DispatchError::Handler(e)
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(e: std::io::Error) -> Self {
        DispatchError::Io(e)
    }
}
