//! Error types for decoding operations.

use std::fmt;

/// Errors that can occur while decoding a VXQ mesh buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The first four bytes do not match a recognized format tag.
    UnknownMagic { found: [u8; 4] },
    /// Declared counts disagree with the actual buffer contents.
    Corrupted {
        context: &'static str,
        detail: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMagic { found } => {
                write!(
                    f,
                    "unknown magic tag {:02x} {:02x} {:02x} {:02x}",
                    found[0], found[1], found[2], found[3]
                )
            }
            Self::Corrupted { context, detail } => {
                write!(f, "corrupted {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
