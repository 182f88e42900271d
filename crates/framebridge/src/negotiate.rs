//! # Protocol Negotiator
//!
//! Picks the one loading protocol a session will use. Candidates are probed
//! in platform order and the first one to answer wins. The last candidate is
//! never probed: it is the fallback taken when nothing earlier confirmed, so
//! negotiation always produces a protocol.
//!
//! | platform | probed                                | fallback      |
//! |----------|---------------------------------------|---------------|
//! | Windows  | `LocalhostSubdomain`                  | `LocaltestMe` |
//! | other    | `Assets`, then `LocalhostSubdomain`   | `LocaltestMe` |
//!
//! Windows webviews cannot load custom schemes at all, so `Assets` is not
//! worth a probe there.

use frameproto::LoadingProtocol;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::page::HostPage;
use crate::page::Platform;
use crate::probe::ProbeError;
use crate::probe::probe;

/// Ordered candidates for a platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Candidates {
    pub probed: &'static [LoadingProtocol],
    pub fallback: LoadingProtocol,
}

pub fn candidates(platform: Platform) -> Candidates {
    match platform {
        Platform::Windows => Candidates {
            probed: &[LoadingProtocol::LocalhostSubdomain],
            fallback: LoadingProtocol::LocaltestMe,
        },
        Platform::Other => Candidates {
            probed: &[LoadingProtocol::Assets, LoadingProtocol::LocalhostSubdomain],
            fallback: LoadingProtocol::LocaltestMe,
        },
    }
}

/// The outcome of negotiation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Negotiated {
    pub protocol: LoadingProtocol,
    /// `false` when the protocol is the untested fallback.
    pub confirmed: bool,
}

/// Probes the platform's candidates and commits to one protocol.
///
/// Never fails. Cancellation skips the remaining probes and takes the
/// fallback.
pub async fn negotiate(
    page: &dyn HostPage,
    http_server_port: u16,
    config: &BridgeConfig,
    cancel: &CancellationToken,
) -> Negotiated {
    let platform = page.platform();
    let Candidates { probed, fallback } = candidates(platform);

    for &protocol in probed {
        let origin = protocol.ping_origin(&config.assets_scheme, http_server_port);
        match probe(page, &origin, config.probe_timeout(), cancel).await {
            Ok(()) => {
                tracing::info!(?platform, %protocol, "loading protocol confirmed");
                return Negotiated {
                    protocol,
                    confirmed: true,
                };
            }
            Err(ProbeError::Cancelled) => {
                tracing::warn!(%protocol, "negotiation cancelled");
                break;
            }
            Err(e @ ProbeError::Timeout(_)) => {
                tracing::warn!(%protocol, %origin, error = %e, "loading protocol unavailable");
            }
        }
    }

    tracing::info!(?platform, protocol = %fallback, "falling back to loading protocol");
    Negotiated {
        protocol: fallback,
        confirmed: false,
    }
}
