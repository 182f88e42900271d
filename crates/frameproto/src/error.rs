//! # Error Definitions
//!
//! Failures of the pure protocol layer: origin parsing and payload encoding.

/// Protocol-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The origin has no `scheme://` separator, so no app id can be read from it.
    MalformedOrigin(String),
    /// The call payload could not be encoded.
    Payload(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedOrigin(origin) => write!(f, "Malformed origin: {:?}", origin),
            Self::Payload(msg) => write!(f, "Payload encode error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
