use std::fmt;

/// The error type returned by every fallible persistence-core operation.
#[derive(Debug)]
pub enum Error {
    /// The store path was missing or the underlying engine could not be opened.
    InitError(String),
    /// A mandatory field was missing, an immutable field was changed, or a
    /// value did not fit its key width.
    InvalidInput(String),
    /// The primary key already exists on `create`.
    Conflict(String),
    /// A value could not be serialized or deserialized.
    EncodingError(String),
    /// The underlying engine failed a read/write/delete.
    StoreIOError(txstore::error::Error),
    /// `NextNonceCallback` returned an error, propagated verbatim.
    CallbackError(Box<dyn std::error::Error + Send + Sync>),
    /// The persistence handle was already `close()`d.
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitError(msg) => write!(f, "init error: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::Conflict(msg) => write!(f, "conflict: {msg}"),
            Error::EncodingError(msg) => write!(f, "encoding error: {msg}"),
            Error::StoreIOError(err) => write!(f, "store io error: {err}"),
            Error::CallbackError(err) => write!(f, "nonce callback error: {err}"),
            Error::Closed => write!(f, "persistence handle is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StoreIOError(err) => Some(err),
            Error::CallbackError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<txstore::error::Error> for Error {
    fn from(err: txstore::error::Error) -> Self {
        Error::StoreIOError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::EncodingError(err.to_string())
    }
}
