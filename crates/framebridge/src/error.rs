//! # Error Definitions
//!
//! Failures past protocol negotiation. Probe failures never appear here: the
//! negotiator absorbs them (see [`crate::probe::ProbeError`]).

use std::time::Duration;

use frameproto::ErrorKind;
use frameproto::RelayReply;

use crate::host::HostError;

/// Failure of a single relayed request. Reported to the requester, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The trusted process rejected or could not complete a signing call.
    SigningFailure(HostError),
    /// Any other host-process call failed.
    HostInvocationFailure(HostError),
    /// The zome call payload could not be encoded.
    Payload(frameproto::Error),
    /// A result could not be converted to a reply value.
    Encode(String),
}

impl BridgeError {
    /// The error kind reported to the requester.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SigningFailure(_) => ErrorKind::SigningFailure,
            Self::HostInvocationFailure(_) => ErrorKind::HostFailure,
            Self::Payload(_) => ErrorKind::Payload,
            Self::Encode(_) => ErrorKind::Internal,
        }
    }

    pub fn to_reply(&self) -> RelayReply {
        RelayReply::error(self.kind(), self.to_string())
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SigningFailure(e) => write!(f, "Signing failed: {}", e),
            Self::HostInvocationFailure(e) => write!(f, "Host invocation failed: {}", e),
            Self::Payload(e) => write!(f, "Payload error: {}", e),
            Self::Encode(msg) => write!(f, "Encode error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SigningFailure(e) | Self::HostInvocationFailure(e) => Some(e),
            Self::Payload(e) => Some(e),
            Self::Encode(_) => None,
        }
    }
}

impl From<frameproto::Error> for BridgeError {
    fn from(e: frameproto::Error) -> Self {
        Self::Payload(e)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure to bring a session up. Fatal: the page shows "not available".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The launcher environment never defined the app interface.
    SetupTimeout(Duration),
    /// The runtime info could not be fetched from the host.
    RuntimeInfo(HostError),
    /// The session was cancelled while starting.
    Cancelled,
    /// The config failed validation; nothing was started.
    InvalidConfig(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetupTimeout(d) => {
                write!(f, "Timeout waiting for the app to be set up ({} ms)", d.as_millis())
            }
            Self::RuntimeInfo(e) => write!(f, "Could not get runtime info: {}", e),
            Self::Cancelled => write!(f, "Session start cancelled"),
            Self::InvalidConfig(msg) => write!(f, "Invalid bridge config: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RuntimeInfo(e) => Some(e),
            _ => None,
        }
    }
}
