//! # Window Message Bus
//!
//! The host window's `message` event target. Every message posted to the
//! window is delivered to every registered listener, the same way a browser
//! dispatches a `MessageEvent` to each `message` handler.
//!
//! ## Lifecycle
//!
//! - A [`Listener`] is registered by [`MessageBus::listen`] and unregistered
//!   when it is dropped. There is no other way to unregister, so a listener
//!   cannot outlive the code that owns it.
//! - Messages posted while a listener is registered are buffered in its
//!   channel until read.
//!
//! Replies never travel over the bus. Each message carries its own
//! [`ReplyPort`]s, and a reply goes only to the holder of the matching
//! [`PortReceiver`].

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use frameproto::RelayReply;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::page::FrameId;

/// Strong type for listener registrations.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A message event as seen by the host window.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Origin the sender reports, e.g. `happ://forum`.
    pub origin: String,
    /// The frame whose content window posted the message, if it was one of ours.
    pub source: Option<FrameId>,
    /// Structured payload.
    pub data: Value,
    /// Transferred reply ports. Only the first one is ever answered.
    pub ports: Vec<ReplyPort>,
}

/// Sending half of a message channel, transferred along with a message.
#[derive(Clone, Debug)]
pub struct ReplyPort {
    tx: mpsc::UnboundedSender<RelayReply>,
}

impl ReplyPort {
    /// Posts a reply. Returns `false` if the other side has gone away.
    pub fn post(&self, reply: RelayReply) -> bool {
        self.tx.send(reply).is_ok()
    }
}

/// Receiving half of a message channel, kept by the requester.
#[derive(Debug)]
pub struct PortReceiver {
    rx: mpsc::UnboundedReceiver<RelayReply>,
}

impl PortReceiver {
    /// Waits for the next reply. `None` once every port clone is dropped.
    pub async fn recv(&mut self) -> Option<RelayReply> {
        self.rx.recv().await
    }

    /// Returns a reply if one is already waiting.
    pub fn try_recv(&mut self) -> Option<RelayReply> {
        self.rx.try_recv().ok()
    }
}

/// Creates a connected port pair.
pub fn message_channel() -> (ReplyPort, PortReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReplyPort { tx }, PortReceiver { rx })
}

/// Fan-out dispatcher for window messages.
///
/// Uses DashMap so listeners can be added and dropped from any task while a
/// post is in progress elsewhere.
#[derive(Debug, Default)]
pub struct MessageBus {
    listeners: DashMap<ListenerId, mpsc::UnboundedSender<InboundMessage>>,
    next_id: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener that receives every message posted from now on.
    pub fn listen(self: &Arc<Self>) -> Listener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);
        tracing::trace!(listener = %id, "listener registered");

        Listener {
            id,
            rx,
            bus: Arc::clone(self),
        }
    }

    /// Delivers `message` to every registered listener and returns how many
    /// received it.
    pub fn post(&self, message: InboundMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.listeners.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        // removal must wait until the iterator's shard locks are released
        for id in closed {
            self.listeners.remove(&id);
        }

        delivered
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn unregister(&self, id: ListenerId) {
        self.listeners.remove(&id);
        tracing::trace!(listener = %id, "listener unregistered");
    }
}

/// A registration on the [`MessageBus`]; unregisters itself on drop.
#[derive(Debug)]
pub struct Listener {
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<InboundMessage>,
    bus: Arc<MessageBus>,
}

impl Listener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Waits for the next message posted to the window.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.bus.unregister(self.id);
    }
}
