//! The middleware stack: an ordered handler list plus the chain built from it.
//!
//! Configure a [`Stack`] at startup, then hand it to
//! [`Server::serve`](crate::Server::serve). The server moves it behind an
//! `Arc`, so once traffic starts the stack can no longer be mutated: the
//! configure-then-serve ordering is enforced by ownership rather than locks.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::chain::{Chain, Next};
use crate::error::Error;
use crate::handler::{BoxedHandler, Endpoint, Handler, endpoint_fn, handler_fn, wrap};
use crate::middleware::{Logger, Recovery, Static};
use crate::request::Request;
use crate::response::{Response, ResponseWriter};

/// An ordered stack of middleware handlers.
///
/// Handlers run in the order they were pushed. Every push rebuilds the
/// whole chain, so the chain always mirrors the handler list exactly.
///
/// ```rust
/// use std::io::Write;
/// use strata::{Recorder, Request, Stack};
///
/// let mut stack = Stack::new();
/// stack
///     .push_fn(|rw, req, next| {
///         write!(rw, "1").unwrap();
///         next.run(rw, req);
///     })
///     .push_endpoint_fn(|rw, _req| {
///         write!(rw, "2").unwrap();
///     });
///
/// let mut recorder = Recorder::new();
/// let mut req = Request::from(http::Request::get("/").body("").unwrap());
/// stack.serve(&mut recorder, &mut req);
/// assert_eq!(recorder.body(), b"12");
/// ```
pub struct Stack {
    handlers: Vec<BoxedHandler>,
    chain: Chain,
}

impl Stack {
    /// A stack with no middleware.
    pub fn new() -> Self {
        Self { handlers: Vec::new(), chain: Chain::default() }
    }

    /// A stack pre-populated with `handlers`, in order.
    pub fn from_handlers<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        let handlers: Vec<_> = handlers.into_iter().collect();
        let chain = Chain::build(&handlers);
        Self { handlers, chain }
    }

    /// The default stack:
    ///
    /// 1. [`Recovery`]: panic recovery, outermost so it guards everything after it
    /// 2. [`Logger`]: request/response logging
    /// 3. [`Static`]: static files from `./public`
    pub fn classic() -> Self {
        Self::from_handlers([
            Arc::new(Recovery::new()) as BoxedHandler,
            Arc::new(Logger::new()),
            Arc::new(Static::new("public")),
        ])
    }

    /// Appends a handler and rebuilds the chain. Returns `self` for chaining.
    pub fn push(&mut self, handler: impl Handler) -> &mut Self {
        self.push_boxed(Arc::new(handler))
    }

    /// Appends an already-boxed handler; the same handler may sit in
    /// several stacks.
    pub fn push_boxed(&mut self, handler: BoxedHandler) -> &mut Self {
        self.handlers.push(handler);
        self.chain = Chain::build(&self.handlers);
        self
    }

    /// Appends a handler that may be absent, for stacks assembled from
    /// optional configuration. `None` is a configuration error and leaves
    /// the stack untouched.
    pub fn try_push(&mut self, handler: Option<BoxedHandler>) -> Result<&mut Self, Error> {
        match handler {
            Some(handler) => Ok(self.push_boxed(handler)),
            None => {
                error!(position = self.handlers.len(), "refusing to push a nil handler");
                Err(Error::NilHandler)
            }
        }
    }

    /// Appends a function with the middleware signature.
    pub fn push_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Response<'_>, &mut Request, Next<'_>) + Send + Sync + 'static,
    {
        self.push(handler_fn(f))
    }

    /// Appends a plain [`Endpoint`]; the chain always continues after it.
    pub fn push_endpoint(&mut self, endpoint: impl Endpoint) -> &mut Self {
        self.push(wrap(endpoint))
    }

    /// Appends a plain endpoint function; the chain always continues after it.
    pub fn push_endpoint_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Response<'_>, &mut Request) + Send + Sync + 'static,
    {
        self.push_endpoint(endpoint_fn(f))
    }

    /// The handlers in dispatch order.
    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.handlers
    }

    /// A handle to the current chain. Later pushes build a new chain and
    /// leave this one untouched.
    pub fn chain(&self) -> Chain {
        self.chain.clone()
    }

    /// Dispatches one request: wraps `rw` in a tracking [`Response`] and runs
    /// the chain from the top.
    pub fn serve(&self, rw: &mut dyn ResponseWriter, req: &mut Request) {
        self.chain.invoke(&mut Response::new(rw), req);
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|h| h.name())).finish()
    }
}
