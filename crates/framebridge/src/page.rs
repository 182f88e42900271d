//! # Host Page
//!
//! The slice of the host document and window the bridge touches: mounting
//! and removing iframes, reading the query string and runtime platform, the
//! launcher environment the trusted process injects, and the window's
//! message bus.
//!
//! DOM operations are synchronous, so this trait is too.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::bus::MessageBus;

/// Strong type for mounted frames.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct FrameId(pub u64);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// An iframe to append to the document body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Iframe {
    pub src: String,
    /// Hidden frames are `display: none`; visible ones are borderless.
    pub hidden: bool,
}

impl Iframe {
    pub fn visible(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            hidden: false,
        }
    }

    pub fn hidden(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            hidden: true,
        }
    }
}

/// Runtime platform class, as far as iframe loading is concerned.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Windows,
    Other,
}

impl Platform {
    /// Classifies a `navigator.appVersion`-style string.
    pub fn from_app_version(app_version: &str) -> Self {
        if app_version.contains("Win") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Environment the trusted process injects into the page once the app
/// interface is set up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LauncherEnv {
    #[serde(default)]
    pub app_interface_port: Option<u16>,
    #[serde(default)]
    pub app_interface_token: Option<Vec<u8>>,
    #[serde(default)]
    pub admin_interface_port: Option<u16>,
    #[serde(default)]
    pub installed_app_id: Option<String>,
}

impl LauncherEnv {
    /// The app interface, once both of its fields are defined.
    pub fn app_interface(&self) -> Option<AppInterface> {
        match (&self.app_interface_port, &self.app_interface_token) {
            (Some(port), Some(token)) => Some(AppInterface {
                port: *port,
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

/// Connection details for the app websocket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInterface {
    pub port: u16,
    pub token: Vec<u8>,
}

/// The host document and window.
pub trait HostPage: Send + Sync + 'static {
    /// The runtime's `navigator.appVersion`.
    fn app_version(&self) -> String;

    fn platform(&self) -> Platform {
        Platform::from_app_version(&self.app_version())
    }

    /// `window.location.search`, including the leading `?` when non-empty.
    fn query_string(&self) -> String;

    /// Appends an iframe as a direct child of the body.
    fn append_iframe(&self, frame: Iframe) -> FrameId;

    /// Removes a previously appended iframe. Returns `false` if it was not mounted.
    fn remove_iframe(&self, id: FrameId) -> bool;

    /// The window's `message` event target.
    fn messages(&self) -> Arc<MessageBus>;

    /// Current snapshot of the launcher environment.
    fn launcher_env(&self) -> LauncherEnv;

    /// Replaces the page content with a terminal "not available" indication.
    fn show_unavailable(&self, reason: &str);
}
