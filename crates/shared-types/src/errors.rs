//! # Shared Error Kinds
//!
//! The cross-subsystem error taxonomy. Subsystems define their own
//! `thiserror` enums for local detail and convert into [`CoreError`] at
//! component boundaries.
//!
//! Peer-originated input never panics the core: validation, protocol,
//! conflict, and capacity failures are dropped-and-counted; only internal
//! invariant violations are fatal.

use thiserror::Error;

/// Cross-subsystem error taxonomy.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed transaction, bad signature, insufficient balance,
    /// broken PoH chain, bad block signature. Drop the item.
    #[error("validation: {0}")]
    Validation(String),

    /// Stale probe nonce, missing witness quorum, excessive timestamp
    /// skew. Drop the item.
    #[error("protocol: {0}")]
    Protocol(String),

    /// Datagram send/recv failure or unreachable peer. Retried with
    /// backoff; the peer is marked unhealthy past a threshold.
    #[error("transient io: {0}")]
    TransientIo(String),

    /// Double spend, nonce reuse, duplicate transaction id. The later
    /// arrival is dropped.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Mempool or reconstruction buffer at capacity. Oldest entries are
    /// evicted.
    #[error("capacity: {0}")]
    Capacity(String),

    /// Internal invariant violation or crypto-library failure. Surfaces
    /// to the host.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    /// True for kinds the node recovers from locally.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CoreError::Fatal(_))
    }
}
