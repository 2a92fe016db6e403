//! Thread-safe account map.
//!
//! Readers share the map; writers take per-account locks in pubkey
//! order before mutating, so concurrent transfers over disjoint accounts
//! never contend and overlapping transfers never deadlock.

use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use shared_types::time::unix_micros;
use shared_types::{Hash, PublicKey};

use super::entities::{Account, Snapshot};
use super::errors::AccountError;

/// All account records, keyed and ordered by pubkey.
#[derive(Debug, Default)]
pub struct AccountState {
    accounts: RwLock<BTreeMap<PublicKey, Arc<Mutex<Account>>>>,
    transactions_processed: AtomicU64,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the map from genesis balances.
    pub fn with_genesis(balances: impl IntoIterator<Item = (PublicKey, u64)>) -> Self {
        let state = Self::new();
        let now = unix_micros();
        {
            let mut accounts = state.accounts.write();
            for (pubkey, balance) in balances {
                accounts.insert(
                    pubkey,
                    Arc::new(Mutex::new(Account {
                        balance,
                        nonce: 0,
                        last_modified: now,
                    })),
                );
            }
        }
        debug!(accounts = state.account_count(), "account state seeded");
        state
    }

    fn get_or_create(&self, pubkey: &PublicKey) -> Arc<Mutex<Account>> {
        if let Some(account) = self.accounts.read().get(pubkey) {
            return Arc::clone(account);
        }
        let mut accounts = self.accounts.write();
        Arc::clone(accounts.entry(*pubkey).or_insert_with(|| {
            Arc::new(Mutex::new(Account {
                balance: 0,
                nonce: 0,
                last_modified: unix_micros(),
            }))
        }))
    }

    fn get(&self, pubkey: &PublicKey) -> Option<Arc<Mutex<Account>>> {
        self.accounts.read().get(pubkey).map(Arc::clone)
    }

    /// Balance lookup; absent accounts materialize with zero balance.
    pub fn get_balance(&self, pubkey: &PublicKey) -> u64 {
        self.get_or_create(pubkey).lock().balance
    }

    /// Current nonce of an account, zero if absent.
    pub fn get_nonce(&self, pubkey: &PublicKey) -> u64 {
        self.get(pubkey).map(|a| a.lock().nonce).unwrap_or(0)
    }

    /// Atomic debit/credit. Locks are taken in pubkey order; on any
    /// failure neither account changes.
    pub fn transfer(
        &self,
        from: &PublicKey,
        to: &PublicKey,
        amount: u64,
    ) -> Result<(), AccountError> {
        if amount == 0 {
            return Err(AccountError::ZeroAmount);
        }
        let from_account = self
            .get(from)
            .ok_or_else(|| AccountError::UnknownSender(hex::encode(&from[..4])))?;

        if from == to {
            // Self-send: net zero, but the balance check and nonce bump
            // still apply.
            let mut account = from_account.lock();
            if account.balance < amount {
                return Err(AccountError::InsufficientBalance {
                    have: account.balance,
                    need: amount,
                });
            }
            account.nonce += 1;
            account.last_modified = unix_micros();
            self.transactions_processed.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let to_account = self.get_or_create(to);

        // Total order on pubkeys prevents deadlock between concurrent
        // transfers over the same pair.
        let (first, second) = if from < to {
            (&from_account, &to_account)
        } else {
            (&to_account, &from_account)
        };
        let mut first_guard = first.lock();
        let mut second_guard = second.lock();
        let (sender, receiver) = if from < to {
            (&mut *first_guard, &mut *second_guard)
        } else {
            (&mut *second_guard, &mut *first_guard)
        };

        if sender.balance < amount {
            return Err(AccountError::InsufficientBalance {
                have: sender.balance,
                need: amount,
            });
        }

        sender.balance -= amount;
        sender.nonce += 1;
        receiver.balance += amount;
        let now = unix_micros();
        sender.last_modified = now;
        receiver.last_modified = now;
        self.transactions_processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Faucet mint: credits the receiver without a debit. Only the block
    /// pipeline calls this, after checking the sender is the configured
    /// faucet key.
    pub fn credit(&self, to: &PublicKey, amount: u64) -> Result<(), AccountError> {
        if amount == 0 {
            return Err(AccountError::ZeroAmount);
        }
        let account = self.get_or_create(to);
        let mut guard = account.lock();
        guard.balance += amount;
        guard.last_modified = unix_micros();
        self.transactions_processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> u64 {
        self.accounts
            .read()
            .values()
            .map(|a| a.lock().balance)
            .sum()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn transactions_processed(&self) -> u64 {
        self.transactions_processed.load(Ordering::Relaxed)
    }

    /// Deterministic hash over all accounts ordered by pubkey. Balances
    /// and nonces only; `last_modified` stays out.
    pub fn state_root(&self) -> Hash {
        let accounts = self.accounts.read();
        let mut hasher = Sha256::new();
        for (pubkey, account) in accounts.iter() {
            let guard = account.lock();
            hasher.update(pubkey);
            hasher.update(guard.balance.to_le_bytes());
            hasher.update(guard.nonce.to_le_bytes());
        }
        hasher.finalize().into()
    }

    /// Point-in-time copy for block replay.
    pub fn snapshot(&self) -> Snapshot {
        let accounts = self.accounts.read();
        Snapshot {
            accounts: accounts
                .iter()
                .map(|(k, v)| (*k, v.lock().clone()))
                .collect(),
        }
    }

    /// Replace the whole map with a snapshot.
    pub fn restore(&self, snapshot: Snapshot) {
        let mut accounts = self.accounts.write();
        *accounts = snapshot
            .accounts
            .into_iter()
            .map(|(k, v)| (k, Arc::new(Mutex::new(v))))
            .collect();
    }

    /// Build a detached state from a snapshot, for re-execution off the
    /// live map.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let state = Self::new();
        state.restore(snapshot);
        state
    }

    /// Drop zero-balance, zero-nonce accounts untouched for
    /// `max_idle_us`. Returns how many were removed.
    pub fn cleanup_stale(&self, now_us: u64, max_idle_us: u64) -> usize {
        let mut accounts = self.accounts.write();
        let before = accounts.len();
        accounts.retain(|_, account| {
            let guard = account.lock();
            !(guard.balance == 0
                && guard.nonce == 0
                && now_us.saturating_sub(guard.last_modified) > max_idle_us)
        });
        let removed = before - accounts.len();
        if removed > 0 {
            debug!(removed, "cleaned up stale empty accounts");
        }
        removed
    }
}
