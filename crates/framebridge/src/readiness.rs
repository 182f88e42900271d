//! # Setup Readiness
//!
//! The trusted process injects the app interface port and token into the
//! page once the app websocket is authorized. Nothing useful can happen
//! before that, so a session polls for both fields and gives up after a
//! bounded wait.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::page::AppInterface;
use crate::page::HostPage;

/// Polls the launcher environment every `interval` until the app interface
/// is defined, failing with [`SessionError::SetupTimeout`] after `timeout`.
///
/// A zero `interval` is rejected with [`SessionError::InvalidConfig`].
pub async fn wait_for_app_setup(
    page: &dyn HostPage,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<AppInterface, SessionError> {
    if interval.is_zero() {
        return Err(SessionError::InvalidConfig("setup poll interval must be positive".into()));
    }

    let poll = async {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(interface) = page.launcher_env().app_interface() {
                return interface;
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        res = tokio::time::timeout(timeout, poll) => {
            let interface = res.map_err(|_| SessionError::SetupTimeout(timeout))?;
            tracing::debug!(port = interface.port, "app interface ready");
            Ok(interface)
        }
    }
}
