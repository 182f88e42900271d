//! # Zome Call Envelopes
//!
//! A sandboxed app asks for a call to be signed by sending a
//! [`ZomeCallRequest`] with a structured payload. The bridge turns it into a
//! [`ZomeCallUnsigned`]: the payload is binary encoded, a fresh random nonce is
//! attached and the call is given an expiry. The trusted process signs that
//! envelope and hands back a [`SignedZomeCall`], which the bridge never looks
//! inside.

use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::payload;

/// How long a nonce stays valid, as enforced by the trusted process.
pub const DEFAULT_NONCE_LIFETIME: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentPubKey(pub Vec<u8>);

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DnaHash(pub Vec<u8>);

/// Capability secret, carried through unchanged when present.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapSecret(pub Vec<u8>);

/// A cell is addressed by its DNA and the agent running it.
/// Serialized as the pair `[dna_hash, agent_pub_key]`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellId(pub DnaHash, pub AgentPubKey);

/// Microseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let micros = time
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(micros)
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        let micros = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(micros))
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }
}

/// Single-use 256-bit nonce.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce256(pub [u8; 32]);

impl Nonce256 {
    /// Draws a nonce from the operating system's secure RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Expiry for a nonce issued at `now`.
pub fn nonce_expiration(now: Timestamp, lifetime: Duration) -> Timestamp {
    now.saturating_add(lifetime)
}

/// A zome call as the sandboxed app describes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZomeCallRequest {
    pub provenance: AgentPubKey,
    pub cell_id: CellId,
    pub zome_name: String,
    pub fn_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_secret: Option<CapSecret>,
    /// Structured payload; encoded to bytes before signing.
    #[serde(default)]
    pub payload: Value,
}

/// The envelope handed to the trusted process for signing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZomeCallUnsigned {
    pub provenance: AgentPubKey,
    pub cell_id: CellId,
    pub zome_name: String,
    pub fn_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_secret: Option<CapSecret>,
    pub payload: Vec<u8>,
    pub nonce: Nonce256,
    pub expires_at: Timestamp,
}

impl ZomeCallUnsigned {
    /// Builds the envelope for `request`, encoding its payload.
    ///
    /// The caller supplies the nonce and expiry so that both stay visible at
    /// the call site; see [`Nonce256::random`] and [`nonce_expiration`].
    pub fn new(request: ZomeCallRequest, nonce: Nonce256, expires_at: Timestamp) -> Result<Self> {
        let payload = payload::encode(&request.payload)?;
        Ok(Self {
            provenance: request.provenance,
            cell_id: request.cell_id,
            zome_name: request.zome_name,
            fn_name: request.fn_name,
            cap_secret: request.cap_secret,
            payload,
            nonce,
            expires_at,
        })
    }
}

/// Whatever the trusted signer returns. Opaque to the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedZomeCall(pub Value);

impl SignedZomeCall {
    pub fn into_value(self) -> Value {
        self.0
    }
}
