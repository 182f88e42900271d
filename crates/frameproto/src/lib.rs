//! # Frameproto
//!
//! Wire-level vocabulary shared by the host page bridge and the sandboxed
//! happ it embeds.
//!
//! ## Contents
//!
//! - **Loading protocols**: the three origin families a happ can be served
//!   from, and the pure functions that derive an origin from an app id and
//!   recover the app id from an origin.
//! - **Relay messages**: the typed requests a sandboxed app may send over the
//!   window message channel, and the replies it gets back.
//! - **Zome calls**: the unsigned envelope the bridge builds (fresh nonce,
//!   bounded expiry, binary payload) and the opaque signed envelope the
//!   trusted process returns.
//! - **Payload codec**: MessagePack encoding of structured call payloads.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod payload;
pub mod protocol;
pub mod relay;
pub mod zome_call;

pub use error::Error;
pub use error::Result;
pub use protocol::AppId;
pub use protocol::LoadingProtocol;
pub use protocol::app_id_from_origin;
pub use protocol::app_origin;
pub use relay::AppRuntimeInfo;
pub use relay::ErrorKind;
pub use relay::RelayReply;
pub use relay::RelayRequest;
pub use relay::RuntimeInfo;
pub use zome_call::Nonce256;
pub use zome_call::SignedZomeCall;
pub use zome_call::Timestamp;
pub use zome_call::ZomeCallRequest;
pub use zome_call::ZomeCallUnsigned;
