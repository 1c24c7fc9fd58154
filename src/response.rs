//! Response sinks and the status-tracking [`Response`] wrapper.
//!
//! Handlers never see the raw sink. [`Stack::serve`](crate::Stack::serve)
//! wraps it in a [`Response`] first, which records the status code and the
//! number of body bytes written so that middleware running *after* its
//! continuation (logging, recovery) can inspect what happened downstream.
//!
//! ```text
//! server ──▶ Recorder (buffers status, headers, body)
//!              ▲
//!              │ &mut dyn ResponseWriter
//!            Response (tracks status + size) ──▶ handler chain
//! ```

use std::io;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::debug;

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// A raw response sink.
///
/// Implement this to plug a custom transport (or a test double) under a
/// [`Stack`](crate::Stack). [`Recorder`] is the in-memory implementation the
/// server uses.
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line. Only the first call has any effect.
    fn write_header(&mut self, status: StatusCode);

    /// Appends `buf` to the body, sending `200 OK` first if no status was set.
    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize>;
}

// ── Response ──────────────────────────────────────────────────────────────────

/// The response handle passed to every handler in the chain.
///
/// Writes go straight through to the wrapped sink; the wrapper only
/// remembers the first status code and counts body bytes.
///
/// `Response` implements [`std::io::Write`], so `write!` works:
///
/// ```rust
/// use std::io::Write;
/// use strata::{Recorder, Response};
///
/// let mut recorder = Recorder::new();
/// let mut rw = Response::new(&mut recorder);
/// write!(rw, "hello {}", 42).unwrap();
/// assert_eq!(rw.size(), 8);
/// ```
pub struct Response<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    size: usize,
}

impl<'a> Response<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, status: None, size: 0 }
    }

    /// The status written so far, or `None` if nothing has been written.
    pub fn status(&self) -> Option<StatusCode> { self.status }

    /// Number of body bytes written so far.
    pub fn size(&self) -> usize { self.size }

    /// Whether a status line has been sent. Middleware that writes a
    /// response must not run its continuation afterwards.
    pub fn written(&self) -> bool { self.status.is_some() }
}

impl ResponseWriter for Response<'_> {
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }

    fn write_header(&mut self, status: StatusCode) {
        if let Some(sent) = self.status {
            debug!(%sent, ignored = %status, "superfluous write_header call");
            return;
        }
        self.status = Some(status);
        self.inner.write_header(status);
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.written() {
            self.write_header(StatusCode::OK);
        }
        let n = self.inner.write_body(buf)?;
        self.size += n;
        Ok(n)
    }
}

impl io::Write for Response<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// An in-memory [`ResponseWriter`].
///
/// The server runs every request against a fresh `Recorder` and converts it
/// into a hyper response once the chain returns. It doubles as the sink for
/// exercising a [`Stack`](crate::Stack) in tests.
#[derive(Debug, Default)]
pub struct Recorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until a handler writes a status or a body.
    pub fn status(&self) -> Option<StatusCode> { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts into the response the server sends. An unwritten status
    /// becomes `200 OK`, matching what a client observes from an empty chain.
    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::header::CONTENT_TYPE;

    use super::*;

    #[test]
    fn untouched_response_reports_nothing_written() {
        let mut recorder = Recorder::new();
        let rw = Response::new(&mut recorder);
        assert_eq!(rw.status(), None);
        assert_eq!(rw.size(), 0);
        assert!(!rw.written());
        assert_eq!(recorder.status(), None);
        assert!(recorder.body().is_empty());
    }

    #[test]
    fn body_write_implies_ok() {
        let mut recorder = Recorder::new();
        let mut rw = Response::new(&mut recorder);
        rw.write_all(b"abc").unwrap();
        rw.write_all(b"de").unwrap();
        assert_eq!(rw.status(), Some(StatusCode::OK));
        assert_eq!(rw.size(), 5);
        assert_eq!(recorder.body(), b"abcde");
    }

    #[test]
    fn first_status_wins() {
        let mut recorder = Recorder::new();
        let mut rw = Response::new(&mut recorder);
        rw.write_header(StatusCode::NOT_FOUND);
        rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rw.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(recorder.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn nested_wrappers_track_independently() {
        let mut recorder = Recorder::new();
        let mut outer = Response::new(&mut recorder);
        {
            let mut inner = Response::new(&mut outer);
            inner.write_all(b"xyz").unwrap();
            assert_eq!(inner.size(), 3);
        }
        assert_eq!(outer.status(), Some(StatusCode::OK));
        assert_eq!(outer.size(), 3);
    }

    #[test]
    fn recorder_converts_into_http_response() {
        let mut recorder = Recorder::new();
        recorder.headers_mut().insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        recorder.write_header(StatusCode::CREATED);
        recorder.write_body(b"made").unwrap();

        let response = recorder.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn unwritten_recorder_converts_to_ok() {
        let response = Recorder::new().into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
