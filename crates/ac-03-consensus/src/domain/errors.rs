//! Probe protocol errors. All of these are peer-recoverable: the proof
//! is dropped, a counter ticks, nothing else changes.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("bad source signature")]
    BadSourceSignature,

    #[error("bad target signature")]
    BadTargetSignature,

    #[error("bad witness signature from {0}")]
    BadWitnessSignature(String),

    #[error("receipt does not match the request")]
    ReceiptMismatch,

    #[error("witness receipt does not match the request")]
    WitnessMismatch,

    #[error("nonce {nonce} already seen within the replay window")]
    StaleNonce { nonce: u64 },

    #[error("witness quorum not met: have {have}, need {need}")]
    QuorumNotMet { have: usize, need: usize },

    #[error("timestamp skew {skew_us}us exceeds bound {bound_us}us")]
    ExcessiveSkew { skew_us: u64, bound_us: u64 },

    #[error("probe round exceeded its {budget_us}us budget")]
    Expired { budget_us: u64 },
}
