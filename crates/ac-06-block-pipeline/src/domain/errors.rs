//! Block validation errors. Every variant is peer-recoverable: the
//! block is discarded and the proposer's failure counter ticks.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block already known")]
    Duplicate,

    #[error("parent block not found")]
    UnknownParent,

    #[error("height {height} does not extend parent height {parent_height}")]
    HeightMismatch { height: u64, parent_height: u64 },

    #[error("proposer is not the scheduled leader for this slot")]
    NotScheduledLeader,

    #[error("block timestamp outside skew bounds")]
    TimestampSkew,

    #[error("proposer signature does not verify")]
    BadSignature,

    #[error("PoH chain does not verify")]
    BadPoh,

    #[error("PoH transaction order does not match the block body")]
    PohOrderMismatch,

    #[error("transaction {0} carries an invalid signature")]
    BadTransaction(String),

    #[error("exchange transaction from a non-faucet key")]
    FaucetViolation,

    #[error("duplicate transaction id inside the block")]
    DuplicateTransaction,

    #[error("recorded batch partitioning does not match the schedule")]
    BatchMismatch,

    #[error("state root mismatch after re-execution")]
    StateRootMismatch,

    #[error("verification exceeded its {budget_us}us budget")]
    VerifyTimeout { budget_us: u64 },
}
