//! # Loading Protocols
//!
//! No single URL scheme can load a happ iframe on every platform: the webview
//! on Windows refuses custom schemes, and some macOS webviews refuse
//! `*.localhost` subdomains. A session picks one of the three families below
//! and derives every origin from it.
//!
//! ## Invariants
//!
//! - `app_origin` is a pure function of its inputs.
//! - For an app id containing none of `.`, `:`, `/`, `?`, parsing the id back
//!   out of `app_origin(p, id, port)` under `p` recovers `id` exactly.

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// The custom scheme the trusted process registers for serving happ assets.
pub const DEFAULT_ASSETS_SCHEME: &str = "happ";

/// Reserved app id used as the host of every probe target.
pub const PING_APP_ID: &str = "ping";

/// Document served for probe targets. Its only job is to announce to the
/// parent window that the scheme loaded.
pub const HANDSHAKE_DOCUMENT: &str = concat!(
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>",
    "<body style=\"width:1px;height:1px\">",
    "<script>window.parent.postMessage(\"pong\", \"*\");</script>",
    "</body></html>",
);

/// Opaque name of a sandboxed application.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The origin family used to address the sandboxed application.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingProtocol {
    /// `<scheme>://<app_id>`, served by the trusted process's custom scheme handler.
    Assets,
    /// `http://<app_id>.localhost:<port>`, served by the internal HTTP server.
    LocalhostSubdomain,
    /// `http://<app_id>.localtest.me:<port>`, a public DNS alias for loopback.
    LocaltestMe,
}

impl LoadingProtocol {
    /// Derives the origin for `app_id` under this protocol.
    ///
    /// `assets_scheme` is only used by [`LoadingProtocol::Assets`].
    pub fn origin(self, assets_scheme: &str, app_id: &str, http_server_port: u16) -> String {
        match self {
            Self::Assets => format!("{}://{}", assets_scheme, app_id),
            Self::LocalhostSubdomain => format!("http://{}.localhost:{}", app_id, http_server_port),
            Self::LocaltestMe => format!("http://{}.localtest.me:{}", app_id, http_server_port),
        }
    }

    /// The origin a probe for this protocol loads.
    pub fn ping_origin(self, assets_scheme: &str, http_server_port: u16) -> String {
        self.origin(assets_scheme, PING_APP_ID, http_server_port)
    }

    /// Recovers the app id from an origin produced under this protocol.
    ///
    /// The custom scheme keeps everything up to the first `/` (after dropping
    /// the query string); the subdomain families keep the first DNS label.
    pub fn parse_app_id<'a>(self, origin: &'a str) -> Result<&'a str> {
        let Some((_, rest)) = origin.split_once("://") else {
            return Err(Error::MalformedOrigin(origin.to_string()));
        };
        let authority = rest.split('?').next().unwrap_or(rest);

        let id = match self {
            Self::Assets => authority.split('/').next(),
            Self::LocalhostSubdomain | Self::LocaltestMe => authority.split('.').next(),
        };
        Ok(id.unwrap_or(authority))
    }
}

impl std::fmt::Display for LoadingProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assets => write!(f, "assets"),
            Self::LocalhostSubdomain => write!(f, "localhost-subdomain"),
            Self::LocaltestMe => write!(f, "localtest-me"),
        }
    }
}

/// Derives an app origin using the default assets scheme.
pub fn app_origin(protocol: LoadingProtocol, app_id: &str, http_server_port: u16) -> String {
    protocol.origin(DEFAULT_ASSETS_SCHEME, app_id, http_server_port)
}

/// Recovers the app id from `origin` under `protocol`.
pub fn app_id_from_origin(protocol: LoadingProtocol, origin: &str) -> Result<AppId> {
    protocol.parse_app_id(origin).map(AppId::from)
}
