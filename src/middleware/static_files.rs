//! Static file serving.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, LOCATION};
use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::chain::Next;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{Response, ResponseWriter};

/// Serves files from a directory.
///
/// Only `GET` and `HEAD` are considered. A request is passed on to the rest
/// of the chain, untouched, whenever it cannot be served from disk: another
/// method, a path outside the prefix, a missing file, a `..` segment. That
/// makes `Static` safe to put in front of application handlers.
///
/// Directories are served through their index file (`index.html` by
/// default); a directory requested without a trailing slash is redirected
/// to the slash-terminated path first so relative links resolve.
#[derive(Debug)]
pub struct Static {
    dir: PathBuf,
    prefix: String,
    index_file: String,
}

impl Static {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), prefix: String::new(), index_file: "index.html".to_owned() }
    }

    /// Only serve requests under `prefix` (e.g. `/assets`), with the prefix
    /// stripped before the file lookup.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_index_file(mut self, name: impl Into<String>) -> Self {
        self.index_file = name.into();
        self
    }

    /// The part of `path` to look up on disk, or `None` if it lies outside
    /// the prefix.
    fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(&self.prefix)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Maps a URL path onto the directory. Rejects anything that could
    /// escape it.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.dir.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// Resolves a request path to a file, following directories to their
    /// index file. The path is percent-decoded before the lookup; one that
    /// does not decode to UTF-8 is skipped.
    fn resolve(&self, url_path: &str) -> Lookup {
        let Ok(decoded) = urlencoding::decode(url_path) else { return Lookup::Skip };
        let Some(rel) = self.strip_prefix(&decoded) else { return Lookup::Skip };
        let Some(mut path) = self.map_path(rel) else { return Lookup::Skip };
        let Ok(meta) = fs::metadata(&path) else { return Lookup::Skip };

        if meta.is_dir() {
            if !url_path.ends_with('/') {
                return Lookup::Redirect(format!("{url_path}/"));
            }
            path.push(&self.index_file);
            if !path.is_file() {
                return Lookup::Skip;
            }
        }
        Lookup::File(path)
    }
}

enum Lookup {
    File(PathBuf),
    Redirect(String),
    Skip,
}

impl Handler for Static {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        let method = req.method().clone();
        if method != Method::GET && method != Method::HEAD {
            next.run(rw, req);
            return;
        }

        let path = match self.resolve(req.path()) {
            Lookup::File(path) => path,
            Lookup::Redirect(location) => {
                match HeaderValue::try_from(location) {
                    Ok(location) => {
                        rw.headers_mut().insert(LOCATION, location);
                        rw.write_header(StatusCode::FOUND);
                    }
                    Err(_) => next.run(rw, req),
                }
                return;
            }
            Lookup::Skip => {
                next.run(rw, req);
                return;
            }
        };

        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), "static file unreadable, passing on: {e}");
                next.run(rw, req);
                return;
            }
        };

        let headers = rw.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(contents.len()));
        rw.write_header(StatusCode::OK);

        if method == Method::HEAD {
            return;
        }
        if let Err(e) = rw.write_all(&contents) {
            warn!(path = %path.display(), "failed to write static file: {e}");
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css"          => "text/css; charset=utf-8",
        "js" | "mjs"   => "text/javascript; charset=utf-8",
        "json"         => "application/json",
        "txt"          => "text/plain; charset=utf-8",
        "xml"          => "application/xml",
        "svg"          => "image/svg+xml",
        "png"          => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif"          => "image/gif",
        "ico"          => "image/x-icon",
        "webp"         => "image/webp",
        "woff2"        => "font/woff2",
        "wasm"         => "application/wasm",
        "pdf"          => "application/pdf",
        _              => "application/octet-stream",
    }
}
