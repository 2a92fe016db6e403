//! Propagation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurbineError {
    #[error("erasure coding failed: {0}")]
    Erasure(String),

    #[error("shred set inconsistent: {0}")]
    InconsistentShreds(String),

    #[error("not enough shreds to reconstruct: have {have}, need {need}")]
    Insufficient { have: usize, need: usize },

    #[error("reconstructed bytes do not decode: {0}")]
    BadBlockBytes(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
