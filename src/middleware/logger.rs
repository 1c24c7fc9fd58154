//! Request logging.

use std::time::Instant;

use http::StatusCode;
use tracing::info;

use crate::chain::Next;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// Emits a `started` event before the rest of the chain runs and a
/// `completed` event, with status, size and latency, after it returns.
///
/// The events go through `tracing`; install a subscriber (for example
/// `tracing_subscriber::fmt::init()`) at startup to see them.
#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for Logger {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        let start = Instant::now();
        info!(
            method = %req.method(),
            path = %req.path(),
            peer = ?req.remote_addr(),
            "started"
        );

        next.run(rw, req);

        // An unwritten response goes out as 200 once the chain returns.
        let status = rw.status().unwrap_or(StatusCode::OK);
        info!(
            method = %req.method(),
            path = %req.path(),
            status = status.as_u16(),
            bytes = rw.size(),
            elapsed = ?start.elapsed(),
            "completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::response::Recorder;
    use crate::stack::Stack;

    #[test]
    fn passes_the_request_through_unchanged() {
        let mut stack = Stack::new();
        stack
            .push(Logger::new())
            .push_fn(|rw, req, _| write!(rw, "{}", req.path()).unwrap());

        let mut recorder = Recorder::new();
        let mut req = Request::from(http::Request::get("/logged").body("").unwrap());
        stack.serve(&mut recorder, &mut req);

        assert_eq!(recorder.status(), Some(StatusCode::OK));
        assert_eq!(recorder.body(), b"/logged");
    }

    #[test]
    fn tolerates_an_empty_remainder() {
        let stack = {
            let mut stack = Stack::new();
            stack.push(Logger::new());
            stack
        };

        let mut recorder = Recorder::new();
        let mut req = Request::from(http::Request::get("/").body("").unwrap());
        stack.serve(&mut recorder, &mut req);
        assert_eq!(recorder.status(), None);
    }
}
