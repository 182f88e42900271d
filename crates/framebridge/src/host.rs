//! # Trusted Host Process
//!
//! The typed surface of the privileged process that holds the signing keys.
//! The bridge treats each operation as an asynchronous, fallible, opaque call.
//!
//! [`InvokeHost`] implements the surface over any [`Invoke`] transport by
//! mapping each operation onto the host's plugin command names.

use std::sync::Arc;

use frameproto::RuntimeInfo;
use frameproto::SignedZomeCall;
use frameproto::ZomeCallUnsigned;
use serde_json::Value;
use serde_json::json;

use crate::transport::Invoke;
use crate::transport::InvokeError;

pub const GET_RUNTIME_INFO: &str = "plugin:holochain|get_runtime_info";
pub const GET_LOCALES: &str = "plugin:holochain|get_locales";
pub const SIGN_ZOME_CALL: &str = "plugin:holochain|sign_zome_call";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The invocation itself failed.
    Invoke(InvokeError),
    /// The host answered, but not with the expected shape.
    UnexpectedResponse { command: String, reason: String },
    /// The request could not be serialized for the host.
    Encode(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoke(e) => write!(f, "Invoke error: {}", e),
            Self::UnexpectedResponse { command, reason } => {
                write!(f, "Unexpected response to {}: {}", command, reason)
            }
            Self::Encode(msg) => write!(f, "Encode error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invoke(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InvokeError> for HostError {
    fn from(e: InvokeError) -> Self {
        Self::Invoke(e)
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Operations the bridge may ask of the trusted process.
#[async_trait::async_trait]
pub trait HostProcess: Send + Sync + 'static {
    /// Ports of the running runtime. Called once per session.
    async fn get_runtime_info(&self) -> Result<RuntimeInfo>;

    /// Locale data, passed through to the app untouched.
    async fn get_locales(&self) -> Result<Value>;

    /// Signs an envelope the bridge built. The result is returned verbatim.
    async fn sign_zome_call(&self, unsigned: ZomeCallUnsigned) -> Result<SignedZomeCall>;
}

/// [`HostProcess`] over an [`Invoke`] transport.
#[derive(Clone)]
pub struct InvokeHost {
    invoker: Arc<dyn Invoke>,
}

impl InvokeHost {
    pub fn new(invoker: Arc<dyn Invoke>) -> Self {
        Self { invoker }
    }
}

#[async_trait::async_trait]
impl HostProcess for InvokeHost {
    async fn get_runtime_info(&self) -> Result<RuntimeInfo> {
        let value = self.invoker.invoke(GET_RUNTIME_INFO, json!({})).await?;
        serde_json::from_value(value).map_err(|e| HostError::UnexpectedResponse {
            command: GET_RUNTIME_INFO.into(),
            reason: e.to_string(),
        })
    }

    async fn get_locales(&self) -> Result<Value> {
        let value = self.invoker.invoke(GET_LOCALES, json!({})).await?;
        Ok(value)
    }

    async fn sign_zome_call(&self, unsigned: ZomeCallUnsigned) -> Result<SignedZomeCall> {
        let unsigned = serde_json::to_value(unsigned).map_err(|e| HostError::Encode(e.to_string()))?;
        let args = json!({ "zomeCallUnsigned": unsigned });

        let value = self.invoker.invoke(SIGN_ZOME_CALL, args).await?;
        Ok(SignedZomeCall(value))
    }
}
