//! # Bridge Session
//!
//! The one long-lived object per host page. Starting a session runs the whole
//! bring-up in order:
//!
//! 1. wait for the launcher environment (bounded by the setup timeout);
//! 2. fetch the runtime info from the trusted process, once;
//! 3. negotiate the loading protocol, once;
//! 4. register the router's listener, mount the app frame, start routing.
//!
//! The config is validated before step 1. An invalid config, or a failure
//! in 1 or 2, is fatal: the page is told to show "not available"
//! and `start` returns the error. Negotiation cannot fail.
//!
//! The listener is registered before the frame is mounted and the router is
//! only spawned once the frame id is known, so no message from the app can
//! slip past, and none is judged against a frame that does not exist yet.

use std::sync::Arc;

use frameproto::AppId;
use frameproto::LoadingProtocol;
use frameproto::RuntimeInfo;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::DropGuard;

use crate::config::BridgeConfig;
use crate::error::SessionError;
use crate::host::HostProcess;
use crate::mount::MountedFrame;
use crate::mount::mount_app_frame;
use crate::negotiate::negotiate;
use crate::page::AppInterface;
use crate::page::HostPage;
use crate::proxy::CallProxy;
use crate::proxy::Clock;
use crate::readiness::wait_for_app_setup;
use crate::router::RouteContext;
use crate::router::Router;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Fluent builder for a [`BridgeSession`].
pub struct SessionBuilder {
    app_id: AppId,
    page: Arc<dyn HostPage>,
    host: Arc<dyn HostProcess>,
    config: BridgeConfig,
    clock: Option<Arc<dyn Clock>>,
    cancel: CancellationToken,
}

impl SessionBuilder {
    pub fn new(app_id: impl Into<AppId>, page: Arc<dyn HostPage>, host: Arc<dyn HostProcess>) -> Self {
        Self {
            app_id: app_id.into(),
            page,
            host,
            config: BridgeConfig::default(),
            clock: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Token that aborts a start in progress and stops a running session.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn start(self) -> Result<BridgeSession> {
        let page = Arc::clone(&self.page);
        match self.bring_up().await {
            Ok(session) => Ok(session),
            Err(SessionError::Cancelled) => Err(SessionError::Cancelled),
            Err(e) => {
                tracing::error!(error = %e, "bridge session unavailable");
                page.show_unavailable(&e.to_string());
                Err(e)
            }
        }
    }

    async fn bring_up(self) -> Result<BridgeSession> {
        let Self {
            app_id,
            page,
            host,
            config,
            clock,
            cancel,
        } = self;

        config
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;

        let app_interface = if config.wait_for_setup {
            let interface = wait_for_app_setup(
                page.as_ref(),
                config.setup_poll_interval(),
                config.setup_timeout(),
                &cancel,
            )
            .await?;
            Some(interface)
        } else {
            None
        };

        let runtime_info = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            res = host.get_runtime_info() => res.map_err(SessionError::RuntimeInfo)?,
        };
        tracing::info!(
            http_server_port = runtime_info.http_server_port,
            app_port = runtime_info.app_port,
            admin_port = runtime_info.admin_port,
            "runtime info received"
        );

        let negotiated = negotiate(page.as_ref(), runtime_info.http_server_port, &config, &cancel).await;

        let listener = page.messages().listen();
        let frame = mount_app_frame(
            page.as_ref(),
            negotiated.protocol,
            &config.assets_scheme,
            &app_id,
            runtime_info.http_server_port,
        );

        let mut proxy = CallProxy::new(Arc::clone(&host), config.nonce_lifetime());
        if let Some(clock) = clock {
            proxy = proxy.with_clock(clock);
        }
        let router = Router::new(RouteContext {
            app_id: app_id.clone(),
            protocol: negotiated.protocol,
            runtime_info,
            frame: frame.id,
            policy: config.source_policy,
            host,
            proxy,
        });
        // dropping the session cancels this child only, never the caller's token
        let stop = cancel.child_token();
        let router = router.spawn(listener, stop.clone());

        tracing::info!(app = %app_id, protocol = %negotiated.protocol, "bridge session ready");
        Ok(BridgeSession {
            app_id,
            runtime_info,
            protocol: negotiated.protocol,
            confirmed: negotiated.confirmed,
            frame,
            app_interface,
            cancel: stop.clone(),
            router,
            _stop_on_drop: stop.drop_guard(),
        })
    }
}

/// A running bridge: the mounted frame plus the router serving it.
///
/// Dropping the session stops the router; [`BridgeSession::shutdown`] also
/// waits for it to finish.
pub struct BridgeSession {
    app_id: AppId,
    runtime_info: RuntimeInfo,
    protocol: LoadingProtocol,
    confirmed: bool,
    frame: MountedFrame,
    app_interface: Option<AppInterface>,
    cancel: CancellationToken,
    router: JoinHandle<()>,
    _stop_on_drop: DropGuard,
}

impl BridgeSession {
    pub fn builder(app_id: impl Into<AppId>, page: Arc<dyn HostPage>, host: Arc<dyn HostProcess>) -> SessionBuilder {
        SessionBuilder::new(app_id, page, host)
    }

    /// Starts a session with the default config.
    pub async fn start(app_id: impl Into<AppId>, page: Arc<dyn HostPage>, host: Arc<dyn HostProcess>) -> Result<Self> {
        SessionBuilder::new(app_id, page, host).start().await
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn runtime_info(&self) -> RuntimeInfo {
        self.runtime_info
    }

    pub fn protocol(&self) -> LoadingProtocol {
        self.protocol
    }

    /// Whether the protocol answered a probe, as opposed to being the fallback.
    pub fn protocol_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn frame(&self) -> &MountedFrame {
        &self.frame
    }

    pub fn app_interface(&self) -> Option<&AppInterface> {
        self.app_interface.as_ref()
    }

    pub fn is_running(&self) -> bool {
        !self.router.is_finished()
    }

    /// Stops the router and waits for its listener to be released.
    pub async fn shutdown(self) {
        let Self { cancel, router, .. } = self;
        cancel.cancel();
        if let Err(e) = router.await {
            tracing::error!(error = %e, "router task failed");
        }
        tracing::info!("bridge session stopped");
    }
}
