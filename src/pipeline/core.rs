use super::MiddlewareDescriptor;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::error::DispatchError;
use std::fmt;
use std::sync::Arc;

/// Terminal handler: the innermost function that produces a route's response.
pub type HandlerFn = Arc<dyn Fn(HandlerRequest) -> HandlerResult + Send + Sync>;

/// Continuation handed to a middleware stage.
///
/// Calling [`run`](Next::run) executes every remaining stage and then the
/// terminal handler. Dropping it without calling `run` short-circuits the chain.
pub struct Next<'a> {
    stages: &'a [MiddlewareDescriptor],
    terminal: &'a HandlerFn,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain with `req`.
    ///
    /// An absent response from downstream comes back as a 200 with an empty
    /// body, so the caller always has a response to post-process.
    pub fn run(self, req: HandlerRequest) -> Result<HandlerResponse, DispatchError> {
        let outcome = match self.stages.split_first() {
            None => (self.terminal)(req)?,
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    terminal: self.terminal,
                };
                match stage {
                    MiddlewareDescriptor::Stateless(m) => m.handle(req, next)?,
                    MiddlewareDescriptor::Constructible(ctor) => {
                        // built against the request as earlier stages left it
                        let instance = ctor.instantiate(&req);
                        instance.handle(req, next)?
                    }
                }
            }
        };
        Ok(outcome.unwrap_or_else(|| HandlerResponse::status_only(200)))
    }

    /// Number of middleware stages still ahead, not counting the terminal handler.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

/// A built chain: ordered stages wrapped around a terminal handler.
///
/// A pipeline is immutable once built. Changing a route's middleware produces
/// a new pipeline that replaces the old one.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<MiddlewareDescriptor>,
    terminal: HandlerFn,
}

impl Pipeline {
    pub fn build(stages: Vec<MiddlewareDescriptor>, terminal: HandlerFn) -> Self {
        Self { stages, terminal }
    }

    /// Execute the chain for one request.
    pub fn execute(&self, req: HandlerRequest) -> Result<HandlerResponse, DispatchError> {
        Next {
            stages: &self.stages,
            terminal: &self.terminal,
        }
        .run(req)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(MiddlewareDescriptor::name).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}
