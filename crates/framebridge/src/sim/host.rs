//! Scripted trusted process.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use frameproto::RuntimeInfo;
use frameproto::ZomeCallUnsigned;
use serde_json::Value;
use serde_json::json;

use crate::host::GET_LOCALES;
use crate::host::GET_RUNTIME_INFO;
use crate::host::SIGN_ZOME_CALL;
use crate::transport;
use crate::transport::Invoke;
use crate::transport::InvokeError;

/// An [`Invoke`] backed by a closure.
pub struct FnInvoker<F>
where
    F: Fn(&str, Value) -> transport::Result<Value> + Send + Sync,
{
    handler: F,
}

impl<F> FnInvoker<F>
where
    F: Fn(&str, Value) -> transport::Result<Value> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait::async_trait]
impl<F> Invoke for FnInvoker<F>
where
    F: Fn(&str, Value) -> transport::Result<Value> + Send + Sync + 'static,
{
    async fn invoke(&self, command: &str, args: Value) -> transport::Result<Value> {
        (self.handler)(command, args)
    }
}

/// A host that answers the three bridge commands and records what it was asked
/// to sign.
///
/// The "signature" is a deterministic stand-in: the unsigned envelope echoed
/// back next to a fixed signature value.
#[derive(Clone)]
pub struct ScriptedHost {
    runtime_info: Arc<Mutex<Option<RuntimeInfo>>>,
    locales: Value,
    sign_latency: Duration,
    reject_signing: Option<String>,
    signed: Arc<Mutex<Vec<ZomeCallUnsigned>>>,
}

impl ScriptedHost {
    pub fn new(runtime_info: RuntimeInfo) -> Self {
        Self {
            runtime_info: Arc::new(Mutex::new(Some(runtime_info))),
            locales: json!({ "locale": "en-US", "available": ["en-US"] }),
            sign_latency: Duration::ZERO,
            reject_signing: None,
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A host whose runtime info call fails, as before the runtime launches.
    pub fn unreachable() -> Self {
        let host = Self::new(RuntimeInfo {
            http_server_port: 0,
            app_port: 0,
            admin_port: 0,
        });
        if let Ok(mut guard) = host.runtime_info.lock() {
            *guard = None;
        }
        host
    }

    pub fn with_locales(mut self, locales: Value) -> Self {
        self.locales = locales;
        self
    }

    pub fn with_sign_latency(mut self, latency: Duration) -> Self {
        self.sign_latency = latency;
        self
    }

    pub fn rejecting_signatures(mut self, reason: impl Into<String>) -> Self {
        self.reject_signing = Some(reason.into());
        self
    }

    /// Envelopes received for signing, in arrival order.
    pub fn signed(&self) -> Vec<ZomeCallUnsigned> {
        self.signed.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn sign(&self, args: Value) -> transport::Result<Value> {
        let unsigned = args
            .get("zomeCallUnsigned")
            .cloned()
            .ok_or_else(|| InvokeError::Rejected("missing zomeCallUnsigned".into()))?;
        let envelope: ZomeCallUnsigned = serde_json::from_value(unsigned.clone())
            .map_err(|e| InvokeError::Rejected(e.to_string()))?;

        if let Ok(mut signed) = self.signed.lock() {
            signed.push(envelope);
        }
        if let Some(reason) = &self.reject_signing {
            return Err(InvokeError::Rejected(reason.clone()));
        }
        Ok(json!({ "zome_call": unsigned, "signature": vec![0u8; 64] }))
    }
}

#[async_trait::async_trait]
impl Invoke for ScriptedHost {
    async fn invoke(&self, command: &str, args: Value) -> transport::Result<Value> {
        match command {
            GET_RUNTIME_INFO => {
                let info = self.runtime_info.lock().ok().and_then(|g| *g);
                let info = info.ok_or_else(|| InvokeError::Unreachable("runtime not launched".into()))?;
                serde_json::to_value(info).map_err(|e| InvokeError::Rejected(e.to_string()))
            }
            GET_LOCALES => Ok(self.locales.clone()),
            SIGN_ZOME_CALL => {
                if !self.sign_latency.is_zero() {
                    tokio::time::sleep(self.sign_latency).await;
                }
                self.sign(args)
            }
            other => Err(InvokeError::UnknownCommand(other.to_string())),
        }
    }
}
