//! Account records and execution outcomes.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, PublicKey};
use std::collections::BTreeMap;

/// One account: balance in base units plus a monotonic transaction
/// counter. `last_modified` is administrative only and never enters the
/// state root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u64,
    pub nonce: u64,
    pub last_modified: u64,
}

/// Point-in-time copy of all accounts, used for block replay and
/// re-validation. Ordered by pubkey so the root is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub accounts: BTreeMap<PublicKey, Account>,
}

impl Snapshot {
    pub fn total_supply(&self) -> u64 {
        self.accounts.values().map(|a| a.balance).sum()
    }
}

/// Per-transaction execution outcome inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Applied,
    InsufficientBalance,
    ZeroAmount,
    UnknownSender,
}

impl TxOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TxOutcome::Applied)
    }
}

/// Outcome of one transaction, paired with its id for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_id: Hash,
    pub outcome: TxOutcome,
}
