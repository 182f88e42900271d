//! # Payload Codec
//!
//! Encodes structured zome call payloads as MessagePack, the encoding the
//! trusted process and the network expect inside a signed call.
//!
//! Integers take their smallest representation and maps keep string keys.

use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

/// Encodes `value` into a fresh buffer.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| Error::Payload(e.to_string()))
}
