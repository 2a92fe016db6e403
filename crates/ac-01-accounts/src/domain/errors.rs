//! Account state errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccountError {
    /// Debit would push the balance below zero; the whole transaction
    /// fails with no state change.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    /// Transfers of zero are rejected.
    #[error("amount must be positive")]
    ZeroAmount,

    /// Transfer from an account that was never funded.
    #[error("unknown sender {0}")]
    UnknownSender(String),
}
