//! HTTP server and graceful shutdown.
//!
//! The server is the only thing that runs a [`Stack`]: every request goes
//! through [`Stack::serve`] and nothing else.
//!
//! # Per-request flow
//!
//! 1. Collect the body (bounded by [`ServerConfig::body_read_timeout`]).
//! 2. Run the chain against a fresh [`Recorder`] on tokio's blocking pool.
//!    Handlers are plain synchronous functions and may block (static files
//!    read from disk), so they must not run on an async worker thread.
//! 3. Convert the recorder into the hyper response.
//!
//! A panic that escapes the chain (no [`Recovery`](crate::middleware::Recovery)
//! installed) fails only its own request, with `500`.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server stops accepting, lets every
//! in-flight connection finish, then returns from `serve`.

use std::convert::Infallible;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Recorder;
use crate::stack::Stack;

const DEFAULT_PORT: u16 = 8080;

/// hyper refuses HTTP/1 read buffers smaller than this.
const MIN_HEADER_BUF: usize = 8192;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Connection limits applied to every accepted connection.
#[derive(Clone, Copy, Debug)]
pub struct ServerConfig {
    /// How long a client may take to send the request head.
    pub header_read_timeout: Duration,
    /// How long a client may take to send the request body. `408` after that.
    pub body_read_timeout: Duration,
    /// How long the stack may take to produce a response once the body is
    /// in. `503` after that; the handler itself keeps running to completion.
    pub write_timeout: Duration,
    /// Upper bound on the buffered request head, in bytes. Values below
    /// 8 KiB are raised to 8 KiB.
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            header_read_timeout: Duration::from_secs(10),
            body_read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            max_header_bytes: 1 << 16,
        }
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
    config: ServerConfig,
}

impl Server {
    /// Configures the server to bind to `addr` when served.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, config: ServerConfig::default() }
    }

    /// Binds to `0.0.0.0:$PORT`, or port 8080 when `PORT` is unset.
    ///
    /// # Panics
    ///
    /// Panics if `PORT` is set but is not a port number.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .unwrap_or_else(|e| panic!("invalid PORT `{port}`: {e}")),
            None => DEFAULT_PORT,
        };
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            config: ServerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        if config.max_header_bytes < MIN_HEADER_BUF {
            warn!(
                requested = config.max_header_bytes,
                applied = MIN_HEADER_BUF,
                "max_header_bytes below the HTTP/1 minimum, raising it"
            );
        }
        self.config = config;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting plain-text connections and dispatching them through
    /// `stack`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, stack: Stack) -> Result<(), Error> {
        self.run(stack, None).await
    }

    /// Like [`serve`](Server::serve), terminating TLS with the PEM-encoded
    /// certificate chain and private key at the given paths.
    pub async fn serve_tls(
        self,
        stack: Stack,
        cert_file: impl AsRef<Path>,
        key_file: impl AsRef<Path>,
    ) -> Result<(), Error> {
        let acceptor = tls_acceptor(cert_file.as_ref(), key_file.as_ref())?;
        info!(
            cert = %cert_file.as_ref().display(),
            key = %key_file.as_ref().display(),
            "tls enabled"
        );
        self.run(stack, Some(acceptor)).await
    }

    async fn run(self, stack: Stack, tls: Option<TlsAcceptor>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // From here on the stack is shared and read-only: no handler can be
        // pushed while requests are in flight.
        let stack = Arc::new(stack);
        let config = self.config;

        info!(addr = %self.addr, handlers = stack.handlers().len(), "strata listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting even if
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let stack = Arc::clone(&stack);
                    let tls = tls.clone();

                    tasks.spawn(async move {
                        match tls {
                            None => serve_connection(stream, stack, remote_addr, config).await,
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(stream) => serve_connection(stream, stack, remote_addr, config).await,
                                Err(e) => warn!(peer = %remote_addr, "tls handshake failed: {e}"),
                            },
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("connection task panicked: {e}");
                        } else {
                            warn!("connection task aborted: {e}");
                        }
                    }
                }
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

/// Drives one connection, HTTP/1.1 or HTTP/2, whichever the client speaks.
async fn serve_connection<S>(stream: S, stack: Arc<Stack>, remote_addr: SocketAddr, config: ServerConfig)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let svc = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let stack = Arc::clone(&stack);
        async move { dispatch(stack, req, remote_addr, config).await }
    });

    let mut builder = ConnBuilder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(config.header_read_timeout)
        .max_buf_size(config.max_header_bytes.max(MIN_HEADER_BUF));

    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
        error!(peer = %remote_addr, "connection error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the stack.
///
/// Never fails from hyper's point of view: unreadable bodies, timeouts and
/// escaped panics all become status-only responses.
async fn dispatch<B>(
    stack: Arc<Stack>,
    req: http::Request<B>,
    remote_addr: SocketAddr,
    config: ServerConfig,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: fmt::Display,
{
    let (parts, body) = req.into_parts();

    let body = match tokio::time::timeout(config.body_read_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
        Err(_) => {
            warn!(peer = %remote_addr, "timed out reading request body");
            return Ok(status_only(StatusCode::REQUEST_TIMEOUT));
        }
    };

    let mut req = Request::from_parts(parts, body, Some(remote_addr));
    let served = tokio::task::spawn_blocking(move || {
        let mut recorder = Recorder::new();
        stack.serve(&mut recorder, &mut req);
        recorder
    });

    match tokio::time::timeout(config.write_timeout, served).await {
        Ok(Ok(recorder)) => Ok(recorder.into_response()),
        Ok(Err(e)) => {
            error!(peer = %remote_addr, "request handler failed: {e}");
            Ok(status_only(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Err(_) => {
            warn!(peer = %remote_addr, "request handler exceeded write timeout");
            Ok(status_only(StatusCode::SERVICE_UNAVAILABLE))
        }
    }
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

// ── TLS ───────────────────────────────────────────────────────────────────────

fn tls_acceptor(cert_file: &Path, key_file: &Path) -> Result<TlsAcceptor, Error> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(File::open(cert_file)?))
        .collect::<Result<Vec<_>, _>>()?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(key_file)?))?
        .ok_or(Error::MissingPrivateKey)?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. On Windows only Ctrl-C exists.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
