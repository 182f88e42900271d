//! # Invoke Transport
//!
//! A minimal, async interface for calling named commands on the trusted host
//! process.
//!
//! ## Philosophy
//!
//! - **Command-Oriented**: The transport knows command names and JSON
//!   arguments, nothing about what the commands mean.
//! - **Request-Response**: Every invocation resolves to exactly one value or
//!   one error. The bridge imposes no timeout; the host is trusted to finish.

use std::fmt;

use serde_json::Value;

/// Errors that occur while invoking a host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The host process is not reachable or the channel was dropped.
    Unreachable(String),
    /// The host process answered with an error.
    Rejected(String),
    /// The command is not registered on the host.
    UnknownCommand(String),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "Host unreachable: {}", msg),
            Self::Rejected(msg) => write!(f, "Host rejected the call: {}", msg),
            Self::UnknownCommand(cmd) => write!(f, "Unknown host command: {}", cmd),
        }
    }
}

impl std::error::Error for InvokeError {}

pub type Result<T> = std::result::Result<T, InvokeError>;

/// A mechanism to invoke a host command and receive its result.
///
/// This trait is designed to be object-safe (`Arc<dyn Invoke>`).
#[async_trait::async_trait]
pub trait Invoke: Send + Sync + 'static {
    /// Invokes `command` with `args` and waits for the result.
    ///
    /// # invariants
    /// - Must return `Ok(value)` with the host's raw result on success.
    /// - Must return `Err` if the host fails or cannot be reached.
    /// - Should not interpret the result.
    async fn invoke(&self, command: &str, args: Value) -> Result<Value>;
}
