use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::pipeline::Next;

/// Turns failures further down the chain into a 500 response.
///
/// Catches both panics and `Err` results. Place it early so it covers every
/// later stage; stages before it are not protected.
#[derive(Default)]
pub struct RecoveryMiddleware;

impl RecoveryMiddleware {
    pub fn new() -> Self {
        Self
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

impl Middleware for RecoveryMiddleware {
    fn handle(&self, req: HandlerRequest, next: Next<'_>) -> HandlerResult {
        let method = req.method.clone();
        let path = req.path.clone();

        match panic::catch_unwind(AssertUnwindSafe(|| next.run(req))) {
            Ok(Ok(resp)) => Ok(Some(resp)),
            Ok(Err(e)) => {
                error!(method = %method, path = %path, error = %e, "Handler failed");
                Ok(Some(HandlerResponse::error(500, "Internal Server Error")))
            }
            Err(payload) => {
                error!(
                    method = %method,
                    path = %path,
                    panic = panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                Ok(Some(HandlerResponse::error(500, "Internal Server Error")))
            }
        }
    }
}
