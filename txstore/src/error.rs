use std::fmt;

/// The error type returned by every fallible [`crate::storage::engine::Engine`] operation.
#[derive(Debug)]
pub enum Error {
    /// The store directory was missing, unusable, or the underlying log could not be opened.
    Init(String),
    /// A read/write/delete against the underlying storage medium failed.
    Io(std::io::Error),
    /// A stored value could not be interpreted (truncated entry, bad length prefix).
    Corruption(String),
    /// Catch-all for conditions that don't fit the above, mirroring upstream's `Internal`.
    Internal(String),
}

pub type CResult<T> = Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Init(msg) => write!(f, "init error: {msg}"),
            Error::Io(err) => write!(f, "storage io error: {err}"),
            Error::Corruption(msg) => write!(f, "corrupt entry: {msg}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
