//! The [`Handler`] trait and its adapters.
//!
//! # Two kinds of handler
//!
//! A **middleware** handler receives a continuation ([`Next`]) and decides
//! whether the rest of the chain runs. An **endpoint** just serves the
//! request. [`Wrap`] bridges the two: it serves, then always continues, so
//! an ordinary endpoint can sit mid-chain as a pass-through or terminate it.
//!
//! ```text
//! fn(&mut Response, &mut Request, Next)  ── handler_fn ──▶ HandlerFn ─┐
//!                                                                     ├─▶ impl Handler
//! impl Endpoint / fn(&mut Response, &mut Request) ── wrap ──▶ Wrap ───┘
//! ```
//!
//! Every handler ends up behind a [`BoxedHandler`] (`Arc<dyn Handler>`): the
//! stack stores handlers of different concrete types in one `Vec`, and the
//! `Arc` lets each rebuilt chain share them without copying.

use std::sync::Arc;

use crate::chain::Next;
use crate::request::Request;
use crate::response::Response;

/// A heap-allocated, type-erased handler shared between the stack and every
/// chain built from it.
pub type BoxedHandler = Arc<dyn Handler>;

// ── Handler ───────────────────────────────────────────────────────────────────

/// A middleware unit in a [`Stack`](crate::Stack).
///
/// Call `next.run(rw, req)` to hand the request to the rest of the chain.
/// Skip it to short-circuit. A handler that writes the response should not
/// call `next` afterwards: later handlers would write a second time.
///
/// ```rust
/// use strata::{Handler, Next, Request, Response, ResponseWriter, StatusCode};
///
/// struct RequireAuth;
///
/// impl Handler for RequireAuth {
///     fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
///         if req.header("authorization").is_some() {
///             next.run(rw, req);
///         } else {
///             rw.write_header(StatusCode::UNAUTHORIZED);
///         }
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>);

    /// Human-readable name for introspection and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Adapts a closure into a [`Handler`]. Build one with [`handler_fn`].
pub struct HandlerFn<F>(F);

/// Wraps a function with the middleware signature.
///
/// ```rust
/// use std::io::Write;
/// use strata::{Stack, handler_fn};
///
/// let mut stack = Stack::new();
/// stack.push(handler_fn(|rw, req, next| {
///     write!(rw, "before ").unwrap();
///     next.run(rw, req);
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Response<'_>, &mut Request, Next<'_>) + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Response<'_>, &mut Request, Next<'_>) + Send + Sync + 'static,
{
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        (self.0)(rw, req, next)
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A plain request handler with no knowledge of the chain.
pub trait Endpoint: Send + Sync + 'static {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request);
}

/// Adapts a closure into an [`Endpoint`]. Build one with [`endpoint_fn`].
pub struct EndpointFn<F>(F);

pub fn endpoint_fn<F>(f: F) -> EndpointFn<F>
where
    F: Fn(&mut Response<'_>, &mut Request) + Send + Sync + 'static,
{
    EndpointFn(f)
}

impl<F> Endpoint for EndpointFn<F>
where
    F: Fn(&mut Response<'_>, &mut Request) + Send + Sync + 'static,
{
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request) {
        (self.0)(rw, req)
    }
}

// ── Wrap ──────────────────────────────────────────────────────────────────────

/// An [`Endpoint`] lifted into a [`Handler`]: serves, then always runs the
/// continuation.
pub struct Wrap<E>(E);

pub fn wrap<E: Endpoint>(endpoint: E) -> Wrap<E> {
    Wrap(endpoint)
}

impl<E: Endpoint> Handler for Wrap<E> {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        self.0.serve(rw, req);
        next.run(rw, req);
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}
