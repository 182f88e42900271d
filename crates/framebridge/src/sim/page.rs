//! Simulated host page.
//!
//! Hidden frames pointed at a served protocol answer like the real handshake
//! document: after the configured latency, if the frame is still mounted, the
//! frame posts a message to the window. Frames for unserved protocols never
//! answer.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use frameproto::LoadingProtocol;
use serde_json::Value;
use serde_json::json;

use crate::bus::InboundMessage;
use crate::bus::MessageBus;
use crate::bus::PortReceiver;
use crate::bus::message_channel;
use crate::page::FrameId;
use crate::page::HostPage;
use crate::page::Iframe;
use crate::page::LauncherEnv;
use crate::page::Platform;

pub const WINDOWS_APP_VERSION: &str = "5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const MACOS_APP_VERSION: &str = "5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15";

pub struct SimulatedPage {
    app_version: String,
    query: String,
    bus: Arc<MessageBus>,
    frames: Arc<DashMap<FrameId, Iframe>>,
    next_frame: AtomicU64,
    served: Vec<(LoadingProtocol, Duration)>,
    appended: Mutex<Vec<Iframe>>,
    env: Mutex<LauncherEnv>,
    unavailable: Mutex<Option<String>>,
}

impl SimulatedPage {
    pub fn new(platform: Platform) -> Self {
        let app_version = match platform {
            Platform::Windows => WINDOWS_APP_VERSION,
            Platform::Other => MACOS_APP_VERSION,
        };
        Self {
            app_version: app_version.to_string(),
            query: String::new(),
            bus: Arc::new(MessageBus::new()),
            frames: Arc::new(DashMap::new()),
            next_frame: AtomicU64::new(1),
            served: Vec::new(),
            appended: Mutex::new(Vec::new()),
            env: Mutex::new(LauncherEnv::default()),
            unavailable: Mutex::new(None),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Probe frames for `protocol` answer immediately.
    pub fn serving(self, protocol: LoadingProtocol) -> Self {
        self.serving_after(protocol, Duration::ZERO)
    }

    /// Probe frames for `protocol` answer after `latency`.
    pub fn serving_after(mut self, protocol: LoadingProtocol, latency: Duration) -> Self {
        self.served.push((protocol, latency));
        self
    }

    /// Launcher environment with the app interface already defined.
    pub fn ready(self) -> Self {
        self.set_launcher_env(LauncherEnv {
            app_interface_port: Some(8888),
            app_interface_token: Some(vec![1, 2, 3, 4]),
            admin_interface_port: None,
            installed_app_id: None,
        });
        self
    }

    pub fn set_launcher_env(&self, env: LauncherEnv) {
        if let Ok(mut guard) = self.env.lock() {
            *guard = env;
        }
    }

    /// Frames currently mounted, in mount order.
    pub fn mounted(&self) -> Vec<(FrameId, Iframe)> {
        let mut frames: Vec<_> = self
            .frames
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        frames.sort_by_key(|(id, _)| id.0);
        frames
    }

    /// Every frame ever appended, in order.
    pub fn appended(&self) -> Vec<Iframe> {
        self.appended.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        self.unavailable.lock().ok().and_then(|g| g.clone())
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    /// Posts `data` to the window as if from inside `frame`, with a reply
    /// port. The origin is the frame's own origin.
    pub fn post_from_frame(&self, frame: FrameId, data: Value) -> Option<PortReceiver> {
        let src = self.frames.get(&frame)?.src.clone();
        Some(self.post(origin_of(&src), Some(frame), data))
    }

    /// Posts `data` with an arbitrary origin and source, with a reply port.
    pub fn post(&self, origin: impl Into<String>, source: Option<FrameId>, data: Value) -> PortReceiver {
        let (port, receiver) = message_channel();
        self.bus.post(InboundMessage {
            origin: origin.into(),
            source,
            data,
            ports: vec![port],
        });
        receiver
    }

    /// Posts `data` without any reply port.
    pub fn post_without_port(&self, origin: impl Into<String>, source: Option<FrameId>, data: Value) {
        self.bus.post(InboundMessage {
            origin: origin.into(),
            source,
            data,
            ports: Vec::new(),
        });
    }

    fn latency_for(&self, src: &str) -> Option<Duration> {
        let protocol = classify(src)?;
        self.served
            .iter()
            .find(|(p, _)| *p == protocol)
            .map(|(_, latency)| *latency)
    }
}

impl HostPage for SimulatedPage {
    fn app_version(&self) -> String {
        self.app_version.clone()
    }

    fn query_string(&self) -> String {
        self.query.clone()
    }

    fn append_iframe(&self, frame: Iframe) -> FrameId {
        let id = FrameId(self.next_frame.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut appended) = self.appended.lock() {
            appended.push(frame.clone());
        }

        let answer = if frame.hidden { self.latency_for(&frame.src) } else { None };
        let origin = origin_of(&frame.src);
        self.frames.insert(id, frame);

        if let (Some(latency), Ok(handle)) = (answer, tokio::runtime::Handle::try_current()) {
            let frames = Arc::clone(&self.frames);
            let bus = Arc::clone(&self.bus);
            handle.spawn(async move {
                tokio::time::sleep(latency).await;
                // a frame removed before loading never runs its script
                if frames.contains_key(&id) {
                    bus.post(InboundMessage {
                        origin,
                        source: Some(id),
                        data: json!("pong"),
                        ports: Vec::new(),
                    });
                }
            });
        }
        id
    }

    fn remove_iframe(&self, id: FrameId) -> bool {
        self.frames.remove(&id).is_some()
    }

    fn messages(&self) -> Arc<MessageBus> {
        Arc::clone(&self.bus)
    }

    fn launcher_env(&self) -> LauncherEnv {
        self.env.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn show_unavailable(&self, reason: &str) {
        if let Ok(mut guard) = self.unavailable.lock() {
            *guard = Some(reason.to_string());
        }
    }
}

/// `scheme://host[:port]` of a URL.
fn origin_of(src: &str) -> String {
    let Some((scheme, rest)) = src.split_once("://") else {
        return "null".to_string();
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    format!("{}://{}", scheme, &rest[..end])
}

fn classify(src: &str) -> Option<LoadingProtocol> {
    let (scheme, rest) = src.split_once("://")?;
    let host = rest.split([':', '/', '?']).next().unwrap_or(rest);
    match scheme {
        "http" | "https" if host.ends_with(".localhost") => Some(LoadingProtocol::LocalhostSubdomain),
        "http" | "https" if host.ends_with(".localtest.me") => Some(LoadingProtocol::LocaltestMe),
        "http" | "https" => None,
        _ => Some(LoadingProtocol::Assets),
    }
}
