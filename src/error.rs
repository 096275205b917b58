//! Error types and handling for byte streams
//!
//! Every stream operation reports failures through [`StreamError`]. Success
//! payloads are plain byte counts, so a zero count is never an error.

use std::io;

/// Main error type for stream operations
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The handle is closed or an argument is malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The backend does not offer this operation in its current mode
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    /// Propagated operating system failure
    #[error("I/O error: {message}")]
    Io {
        kind: io::ErrorKind,
        code: Option<i32>,
        message: String,
    },
    /// Allocation of the handle or its backend state failed
    #[error("resource exhausted")]
    ResourceExhausted,
    /// A line record did not fit in the framing accumulator
    #[error("record exceeds the {capacity}-byte line buffer")]
    RecordTooLong { capacity: usize },
}

impl StreamError {
    pub(crate) fn closed() -> Self {
        StreamError::InvalidArgument("stream is closed".to_string())
    }

    /// The underlying OS error code, if this error carries one
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            StreamError::Io { code, .. } => *code,
            _ => None,
        }
    }

    /// The `io::ErrorKind` this error maps to
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            StreamError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            StreamError::Unsupported(_) => io::ErrorKind::Unsupported,
            StreamError::Io { kind, .. } => *kind,
            StreamError::ResourceExhausted => io::ErrorKind::OutOfMemory,
            StreamError::RecordTooLong { .. } => io::ErrorKind::InvalidData,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Io {
            kind: err.kind(),
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

impl From<nix::Error> for StreamError {
    fn from(err: nix::Error) -> Self {
        io::Error::from_raw_os_error(err as i32).into()
    }
}

impl From<std::collections::TryReserveError> for StreamError {
    fn from(_: std::collections::TryReserveError) -> Self {
        StreamError::ResourceExhausted
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io { code: Some(code), .. } => io::Error::from_raw_os_error(code),
            other => io::Error::new(other.kind(), other.to_string()),
        }
    }
}

/// Result type for byte stream operations
pub type StreamResult<T> = Result<T, StreamError>;
