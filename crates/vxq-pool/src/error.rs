//! Error types for the task pool.

use std::fmt;

use vxq_decode::DecodeError;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by task primitives and surfaced through task futures.
///
/// `Clone` because a de-duplicated fetch resolves every waiting caller
/// with the same stored result, errors included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Underlying network or I/O failure.
    Transport {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// Streamed byte count differs from the declared content length.
    SizeMismatch {
        /// The URL whose transfer mismatched.
        url: String,
        /// Bytes declared by the transfer.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },
    /// JSON parsing failed.
    Json {
        /// The URL whose body failed to parse.
        url: String,
        /// The error message.
        message: String,
    },
    /// Zlib compression or decompression failed.
    Compression {
        /// The operation that failed.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// EXR parsing or bitmap encoding failed.
    Image {
        /// The operation that failed.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Geometry decoding failed.
    Decode(DecodeError),
    /// A worker response did not carry the output shape the submitting
    /// call expected. Indicates a dispatcher bug, not a caller mistake.
    UnexpectedOutput {
        /// The output shape the call expected.
        expected: &'static str,
    },
    /// The pool shut down while the call was outstanding.
    Shutdown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport { url, message } => {
                write!(f, "request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "request to {url} returned status {status}")
            }
            Error::SizeMismatch {
                url,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "transfer from {url} declared {expected} bytes but delivered {actual}"
                )
            }
            Error::Json { url, message } => {
                write!(f, "failed to parse json from {url}: {message}")
            }
            Error::Compression { context, message } => {
                write!(f, "{context} failed: {message}")
            }
            Error::Image { context, message } => {
                write!(f, "{context} failed: {message}")
            }
            Error::Decode(e) => write!(f, "geometry decode failed: {e}"),
            Error::UnexpectedOutput { expected } => {
                write!(f, "worker response did not carry the expected {expected} output")
            }
            Error::Shutdown => write!(f, "task pool shut down"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}
