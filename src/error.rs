//! Crate error types

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for broker operations
///
/// Protocol violations are not represented here: the session answers those
/// with an ERROR frame and terminates the offending connection (see
/// [`crate::session::Session`]). This type covers transport and bootstrap
/// failures only.
#[derive(Debug)]
pub enum Error {
    /// Underlying socket or listener I/O failure
    Io(std::io::Error),
    /// Invalid bootstrap arguments (bad port, unknown server mode)
    InvalidArgument(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::InvalidArgument(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
