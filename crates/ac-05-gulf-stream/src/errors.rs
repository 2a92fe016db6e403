//! Ingress errors.

use shared_types::Hash;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MempoolError {
    /// Same id seen before; the later arrival is dropped.
    #[error("duplicate transaction {}", hex::encode(&.0[..4]))]
    Duplicate(Hash),

    /// The id does not match the canonical body.
    #[error("transaction id mismatch")]
    IdMismatch,

    /// The sender's signature does not verify.
    #[error("bad transaction signature")]
    BadSignature,
}
