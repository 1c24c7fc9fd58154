//! Panic recovery.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use tracing::{error, warn};

use crate::chain::Next;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{Response, ResponseWriter};

/// Catches panics raised by any handler after it in the chain.
///
/// Put it first: it can only guard what runs inside its own continuation.
/// A caught panic is logged at `error` level. If nothing has been written
/// yet the client gets `500 Internal Server Error`; otherwise the partial
/// response is left as it is.
#[derive(Debug, Default)]
pub struct Recovery {
    show_panic_message: bool,
}

impl Recovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the panic message in the `500` body. Useful in development;
    /// leaks internals in production.
    pub fn show_panic_message(mut self, show: bool) -> Self {
        self.show_panic_message = show;
        self
    }
}

impl Handler for Recovery {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        // Response and Request are only inspected after a panic, never
        // relied on for invariants the panicking handler may have broken.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.run(rw, req)));
        let Err(payload) = outcome else { return };

        let message = panic_message(&*payload);
        error!(
            method = %req.method(),
            path = %req.path(),
            panic = %message,
            "recovered from panic while serving request"
        );

        if rw.written() {
            return;
        }

        rw.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);

        let written = if self.show_panic_message {
            write!(rw, "PANIC: {message}")
        } else {
            rw.write_all(b"Internal Server Error")
        };
        if let Err(e) = written {
            warn!("failed to write recovery response: {e}");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
