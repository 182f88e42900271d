//! # Frame Builder
//!
//! Mounts the sandboxed app. The iframe's target is the app origin under the
//! negotiated protocol followed by the host page's query string, verbatim.

use frameproto::AppId;
use frameproto::LoadingProtocol;

use crate::page::FrameId;
use crate::page::HostPage;
use crate::page::Iframe;

/// The mounted app frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountedFrame {
    pub id: FrameId,
    pub src: String,
}

/// The iframe `src` for an app.
pub fn frame_target(
    protocol: LoadingProtocol,
    assets_scheme: &str,
    app_id: &AppId,
    http_server_port: u16,
    query_string: &str,
) -> String {
    let origin = protocol.origin(assets_scheme, app_id.as_str(), http_server_port);
    format!("{}{}", origin, query_string)
}

/// Appends the visible app frame to the page.
pub fn mount_app_frame(
    page: &dyn HostPage,
    protocol: LoadingProtocol,
    assets_scheme: &str,
    app_id: &AppId,
    http_server_port: u16,
) -> MountedFrame {
    let src = frame_target(
        protocol,
        assets_scheme,
        app_id,
        http_server_port,
        &page.query_string(),
    );
    let id = page.append_iframe(Iframe::visible(src.clone()));
    tracing::info!(app = %app_id, frame = %id, %src, "app frame mounted");
    MountedFrame { id, src }
}
