//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body fully collected.
///
/// Handlers receive `&mut Request`, so middleware can attach per-request
/// context through [`extensions_mut`](Request::extensions_mut) for handlers
/// further down the chain to read.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    extensions: Extensions,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            extensions: parts.extensions,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// The peer address, when the request arrived over a socket.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Header lookup by name. Returns `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Build a request from an [`http::Request`], mostly useful in tests:
///
/// ```rust
/// use strata::Request;
///
/// let req = Request::from(http::Request::get("/users").body("").unwrap());
/// assert_eq!(req.path(), "/users");
/// ```
impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body.into(), None)
    }
}
