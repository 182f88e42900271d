//! # Framebridge
//!
//! The host-page half of a sandboxed happ. A [`BridgeSession`] embeds one
//! app in an iframe and is the app's only path to privileged operations.
//!
//! ## Bring-up
//!
//! 1. **Readiness**: wait until the launcher has injected the app interface.
//! 2. **Runtime info**: ask the trusted process for its ports, once.
//! 3. **Negotiation**: probe loading protocols in platform order with hidden
//!    handshake frames and commit to the first that answers.
//! 4. **Mount**: append the visible app frame under the chosen protocol.
//! 5. **Route**: answer the app's requests over per-message reply ports.
//!
//! ## Seams
//!
//! - [`HostPage`] is the DOM and window. [`sim::SimulatedPage`] stands in
//!   for it outside a webview.
//! - [`HostProcess`] is the trusted process that holds keys. [`InvokeHost`]
//!   adapts any [`Invoke`] transport to it.
//!
//! The bridge never holds key material and never retries a signature.

pub mod bus;
pub mod config;
pub mod error;
pub mod host;
pub mod mount;
pub mod negotiate;
pub mod page;
pub mod probe;
pub mod proxy;
pub mod readiness;
pub mod router;
pub mod session;
pub mod sim;
pub mod transport;

pub use bus::InboundMessage;
pub use bus::MessageBus;
pub use bus::PortReceiver;
pub use bus::ReplyPort;
pub use config::BridgeConfig;
pub use config::SourcePolicy;
pub use error::BridgeError;
pub use error::SessionError;
pub use host::HostError;
pub use host::HostProcess;
pub use host::InvokeHost;
pub use page::FrameId;
pub use page::HostPage;
pub use page::LauncherEnv;
pub use page::Platform;
pub use proxy::CallProxy;
pub use proxy::Clock;
pub use session::BridgeSession;
pub use session::SessionBuilder;
pub use transport::Invoke;
pub use transport::InvokeError;

#[cfg(test)]
mod tests;
