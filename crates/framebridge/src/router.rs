//! # Request Router
//!
//! The session's single window-message listener. For each message it reads
//! the sender's app id from the message origin (using the negotiated
//! protocol's rule), decides whether to trust the sender, decodes the
//! request, dispatches it and posts exactly one reply on the message's first
//! reply port.
//!
//! ## Invariants
//!
//! - The router is built only after negotiation, so the origin rule it uses
//!   is the one the app frame was mounted with.
//! - Replies go only to the message's own port. The listener is shared by
//!   every message, but no reply can reach another requester.
//! - Each message is handled in its own task; a slow signature does not hold
//!   up other requests.

use std::sync::Arc;

use frameproto::AppId;
use frameproto::AppRuntimeInfo;
use frameproto::ErrorKind;
use frameproto::LoadingProtocol;
use frameproto::RelayReply;
use frameproto::RelayRequest;
use frameproto::RuntimeInfo;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::InboundMessage;
use crate::bus::Listener;
use crate::config::SourcePolicy;
use crate::error::BridgeError;
use crate::error::Result;
use crate::host::HostProcess;
use crate::page::FrameId;
use crate::proxy::CallProxy;

/// Everything a request handler may read. Fixed for the session's lifetime.
#[derive(Clone)]
pub struct RouteContext {
    pub app_id: AppId,
    pub protocol: LoadingProtocol,
    pub runtime_info: RuntimeInfo,
    /// The mounted app frame.
    pub frame: FrameId,
    pub policy: SourcePolicy,
    pub host: Arc<dyn HostProcess>,
    pub proxy: CallProxy,
}

#[derive(Clone)]
pub struct Router {
    ctx: Arc<RouteContext>,
}

impl Router {
    pub fn new(ctx: RouteContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &RouteContext {
        &self.ctx
    }

    /// Runs the listen loop until `cancel` fires. The listener registration
    /// is released when the loop ends.
    pub fn spawn(self, mut listener: Listener, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!(listener = %listener.id(), "router listening");
            loop {
                let message = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    message = listener.recv() => message,
                };
                let Some(message) = message else {
                    break;
                };

                let router = self.clone();
                tokio::spawn(async move {
                    router.handle(message).await;
                });
            }
            tracing::debug!(listener = %listener.id(), "router stopped");
        })
    }

    /// Routes one message and posts its reply.
    pub async fn handle(&self, message: InboundMessage) {
        let Some(port) = message.ports.first().cloned() else {
            tracing::warn!(origin = %message.origin, "message without reply port dropped");
            return;
        };

        let reply = self.route(&message).await;
        if let RelayReply::Error { kind, message: reason } = &reply {
            tracing::warn!(origin = %message.origin, %kind, %reason, "request failed");
        }
        if !port.post(reply) {
            tracing::debug!(origin = %message.origin, "requester went away before reply");
        }
    }

    /// Computes the reply for one message.
    pub async fn route(&self, message: &InboundMessage) -> RelayReply {
        let app_id = match self.authenticate(message) {
            Ok(app_id) => app_id,
            Err(reason) => return RelayReply::error(ErrorKind::UntrustedSource, reason),
        };

        let request: RelayRequest = match serde_json::from_value(message.data.clone()) {
            Ok(request) => request,
            Err(e) => return RelayReply::error(ErrorKind::BadRequest, e.to_string()),
        };

        tracing::debug!(app = %app_id, request = request.label(), "dispatching");
        match self.dispatch(app_id, request).await {
            Ok(result) => RelayReply::success(result),
            Err(e) => e.to_reply(),
        }
    }

    /// Reads the sender's app id and applies the source policy.
    fn authenticate(&self, message: &InboundMessage) -> std::result::Result<AppId, String> {
        let app_id = frameproto::app_id_from_origin(self.ctx.protocol, &message.origin)
            .map_err(|e| e.to_string())?;

        match self.ctx.policy {
            SourcePolicy::OriginOnly => Ok(app_id),
            SourcePolicy::MountedFrame => {
                if message.source != Some(self.ctx.frame) {
                    return Err(format!("message from {:?} is not from the app frame", message.origin));
                }
                if app_id != self.ctx.app_id {
                    return Err(format!("origin names app {:?}, expected {:?}", app_id.as_str(), self.ctx.app_id.as_str()));
                }
                Ok(app_id)
            }
        }
    }

    async fn dispatch(&self, app_id: AppId, request: RelayRequest) -> Result<Value> {
        match request {
            RelayRequest::GetAppRuntimeInfo => {
                let info = AppRuntimeInfo {
                    app_id,
                    runtime_info: self.ctx.runtime_info,
                };
                serde_json::to_value(info).map_err(|e| BridgeError::Encode(e.to_string()))
            }
            RelayRequest::GetLocales => self
                .ctx
                .host
                .get_locales()
                .await
                .map_err(BridgeError::HostInvocationFailure),
            RelayRequest::SignZomeCall { zome_call } => {
                let signed = self.ctx.proxy.sign(zome_call).await?;
                Ok(signed.into_value())
            }
        }
    }
}
