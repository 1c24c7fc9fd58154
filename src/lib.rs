//! # strata
//!
//! An ordered, composable middleware stack for HTTP services.
//!
//! ## The contract
//!
//! A [`Stack`] is a list of [`Handler`]s. Each request walks the list in
//! the order handlers were pushed. Every handler gets the response, the
//! request, and a [`Next`] continuation:
//!
//! - call `next.run(rw, req)` to delegate to the rest of the stack;
//! - return without calling it to short-circuit.
//!
//! A handler that writes a response must not call `next` afterwards. That
//! is a convention, not a check: break it and the response is written twice.
//!
//! What strata deliberately leaves out:
//!
//! - **Routing**: put a router behind the stack as an [`Endpoint`]
//! - **Async handlers**: handlers are synchronous; the server runs each
//!   request's chain on tokio's blocking pool
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::io::Write;
//! use strata::{Server, Stack};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Recovery → Logger → Static("public")
//!     let mut stack = Stack::classic();
//!
//!     stack.push_fn(|rw, req, next| {
//!         if req.header("x-api-key").is_none() {
//!             use strata::{ResponseWriter, StatusCode};
//!             rw.write_header(StatusCode::UNAUTHORIZED);
//!             return;
//!         }
//!         next.run(rw, req);
//!     });
//!
//!     stack.push_endpoint_fn(|rw, req| {
//!         write!(rw, "hello from {}", req.path()).unwrap();
//!     });
//!
//!     Server::from_env().serve(stack).await.unwrap();
//! }
//! ```

mod chain;
mod error;
mod handler;
mod request;
mod response;
mod server;
mod stack;

pub mod middleware;

pub use chain::{Chain, Next};
pub use error::Error;
pub use handler::{
    BoxedHandler, Endpoint, EndpointFn, Handler, HandlerFn, Wrap, endpoint_fn, handler_fn, wrap,
};
pub use request::Request;
pub use response::{Recorder, Response, ResponseWriter};
pub use server::{Server, ServerConfig};
pub use stack::Stack;

pub use http::{HeaderMap, Method, StatusCode, header};
