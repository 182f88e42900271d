//! # Relay Messages
//!
//! Requests a sandboxed app posts to the host window, and the replies the
//! bridge posts back on the request's reply port.
//!
//! Every request gets exactly one reply. A handled request is answered with
//! `{ "type": "success", "result": ... }`; a request the bridge refuses or
//! fails to complete is answered with `{ "type": "error", "kind", "message" }`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::AppId;
use crate::zome_call::ZomeCallRequest;

/// Ports the sandboxed application needs to reach the runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub http_server_port: u16,
    pub app_port: u16,
    pub admin_port: u16,
}

/// Result of [`RelayRequest::GetAppRuntimeInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRuntimeInfo {
    pub app_id: AppId,
    pub runtime_info: RuntimeInfo,
}

/// A request from the sandboxed app.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayRequest {
    /// Ask the trusted process to sign a zome call on the app's behalf.
    SignZomeCall {
        #[serde(rename = "zomeCall")]
        zome_call: ZomeCallRequest,
    },
    /// Ask for the app id and runtime ports.
    GetAppRuntimeInfo,
    /// Ask for the host's locale data.
    GetLocales,
}

impl RelayRequest {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignZomeCall { .. } => "sign-zome-call",
            Self::GetAppRuntimeInfo => "get-app-runtime-info",
            Self::GetLocales => "get-locales",
        }
    }
}

/// Why a request was not answered with a result.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The message payload is not a known request.
    BadRequest,
    /// The message did not come from the mounted app frame.
    UntrustedSource,
    /// The trusted process rejected or could not complete a signing call.
    SigningFailure,
    /// Any other host-process call failed.
    HostFailure,
    /// The call payload could not be encoded.
    Payload,
    /// The bridge could not build the reply.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BadRequest => "bad-request",
            Self::UntrustedSource => "untrusted-source",
            Self::SigningFailure => "signing-failure",
            Self::HostFailure => "host-failure",
            Self::Payload => "payload",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A reply posted on a request's reply port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayReply {
    Success { result: Value },
    Error { kind: ErrorKind, message: String },
}

impl RelayReply {
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Converts into a `Result`, for requesters that prefer `?`.
    pub fn into_result(self) -> Result<Value, (ErrorKind, String)> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error { kind, message } => Err((kind, message)),
        }
    }
}
