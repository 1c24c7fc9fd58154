//! Unified error type.

use std::fmt;

/// The error type returned by strata's fallible operations.
///
/// Application-level failures (404, 500, etc.) are written to the
/// [`Response`](crate::Response) by middleware, not returned as `Error`s.
/// This type surfaces configuration mistakes and infrastructure failures:
/// pushing a nil handler, binding to a port, loading TLS material.
#[derive(Debug)]
pub enum Error {
    /// Binding, accepting, or reading certificate files failed.
    Io(std::io::Error),
    /// [`Stack::try_push`](crate::Stack::try_push) was given no handler.
    NilHandler,
    /// The certificate chain or private key was rejected by rustls.
    Tls(tokio_rustls::rustls::Error),
    /// The key file contained no PEM-encoded private key.
    MissingPrivateKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)             => write!(f, "io: {e}"),
            Self::NilHandler        => f.write_str("handler cannot be nil"),
            Self::Tls(e)            => write!(f, "tls: {e}"),
            Self::MissingPrivateKey => f.write_str("tls: no private key found in key file"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)  => Some(e),
            Self::Tls(e) => Some(e),
            Self::NilHandler | Self::MissingPrivateKey => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<tokio_rustls::rustls::Error> for Error {
    fn from(e: tokio_rustls::rustls::Error) -> Self {
        Self::Tls(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn nil_handler_has_no_source() {
        let err = Error::NilHandler;
        assert_eq!(err.to_string(), "handler cannot be nil");
        assert!(err.source().is_none());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken"));
        assert_eq!(err.to_string(), "io: taken");
        assert!(err.source().is_some());
    }
}
