//! # Privileged Call Proxy
//!
//! Turns a sandboxed app's zome call into a signed one without the bridge
//! ever holding key material.
//!
//! The proxy is stateless between calls: each call gets a fresh envelope, a
//! fresh nonce and its own expiry, and nothing survives a failed call. A
//! failed call is never retried here, because resending would reuse a nonce;
//! a requester that retries sends a new request and gets a new envelope.
//!
//! ## Invariants
//!
//! - Nonces come from the OS RNG and are never derived from earlier calls.
//! - `expires_at` is `clock.now() + nonce_lifetime`.
//! - The signed envelope is returned verbatim, unverified.

use std::sync::Arc;
use std::time::Duration;

use frameproto::Nonce256;
use frameproto::SignedZomeCall;
use frameproto::Timestamp;
use frameproto::ZomeCallRequest;
use frameproto::ZomeCallUnsigned;
use frameproto::zome_call::nonce_expiration;

use crate::error::BridgeError;
use crate::error::Result;
use crate::host::HostProcess;

/// Source of "now" for nonce expiry.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Builds envelopes and forwards them to the trusted signer.
#[derive(Clone)]
pub struct CallProxy {
    host: Arc<dyn HostProcess>,
    clock: Arc<dyn Clock>,
    nonce_lifetime: Duration,
}

impl CallProxy {
    pub fn new(host: Arc<dyn HostProcess>, nonce_lifetime: Duration) -> Self {
        Self {
            host,
            clock: Arc::new(SystemClock),
            nonce_lifetime,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a fresh unsigned envelope for `request`.
    pub fn envelope(&self, request: ZomeCallRequest) -> Result<ZomeCallUnsigned> {
        let nonce = Nonce256::random();
        let expires_at = nonce_expiration(self.clock.now(), self.nonce_lifetime);
        let unsigned = ZomeCallUnsigned::new(request, nonce, expires_at)?;
        Ok(unsigned)
    }

    /// Signs `request` through the trusted process.
    ///
    /// Returns `Payload` if the payload cannot be encoded and
    /// `SigningFailure` if the host fails; either way nothing is retained.
    pub async fn sign(&self, request: ZomeCallRequest) -> Result<SignedZomeCall> {
        let unsigned = self.envelope(request)?;
        tracing::debug!(
            zome = %unsigned.zome_name,
            function = %unsigned.fn_name,
            expires_at = unsigned.expires_at.as_micros(),
            "requesting signature"
        );

        self.host
            .sign_zome_call(unsigned)
            .await
            .map_err(BridgeError::SigningFailure)
    }
}
