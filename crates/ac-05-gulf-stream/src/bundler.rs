//! Per-target bundle accumulation.
//!
//! Pure queueing: transactions accumulate per target until the bundle
//! hits the size cap or its timeout. The forwarder owns the socket; the
//! queue only decides what to flush and when.

use std::collections::HashMap;

use shared_types::{codec, PublicKey, Transaction};

/// A bundle that is ready to transmit.
#[derive(Debug)]
pub struct ReadyBundle {
    pub target: PublicKey,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct Pending {
    transactions: Vec<Transaction>,
    encoded_bytes: usize,
    oldest_us: u64,
}

/// Accumulates per-target bundles under a size and age bound.
#[derive(Debug, Default)]
pub struct BundleQueue {
    pending: HashMap<PublicKey, Pending>,
}

impl BundleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction for `target`. Returns a bundle when the
    /// addition filled it past `max_bytes`.
    pub fn push(
        &mut self,
        target: PublicKey,
        tx: Transaction,
        now_us: u64,
        max_bytes: usize,
    ) -> Option<ReadyBundle> {
        let tx_bytes = codec::encode(&tx)
            .map(|b| b.len())
            .unwrap_or(max_bytes);

        let pending = self.pending.entry(target).or_default();
        if pending.transactions.is_empty() {
            pending.oldest_us = now_us;
        }
        pending.transactions.push(tx);
        pending.encoded_bytes += tx_bytes;

        if pending.encoded_bytes >= max_bytes {
            let pending = self.pending.remove(&target).expect("entry exists");
            Some(ReadyBundle {
                target,
                transactions: pending.transactions,
            })
        } else {
            None
        }
    }

    /// Bundles whose oldest transaction has waited at least
    /// `timeout_us`.
    pub fn take_due(&mut self, now_us: u64, timeout_us: u64) -> Vec<ReadyBundle> {
        let due: Vec<PublicKey> = self
            .pending
            .iter()
            .filter(|(_, p)| {
                !p.transactions.is_empty()
                    && now_us.saturating_sub(p.oldest_us) >= timeout_us
            })
            .map(|(k, _)| *k)
            .collect();

        due.into_iter()
            .filter_map(|target| {
                self.pending.remove(&target).map(|p| ReadyBundle {
                    target,
                    transactions: p.transactions,
                })
            })
            .collect()
    }

    /// Drop queued bundles for targets whose slots have passed.
    pub fn retain_targets(&mut self, keep: &[PublicKey]) -> usize {
        let before = self.pending.len();
        self.pending.retain(|target, _| keep.contains(target));
        before - self.pending.len()
    }

    pub fn queued_for(&self, target: &PublicKey) -> usize {
        self.pending
            .get(target)
            .map(|p| p.transactions.len())
            .unwrap_or(0)
    }

    pub fn targets(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransactionType;

    const TARGET: PublicKey = [9u8; 33];

    fn tx(n: u64) -> Transaction {
        let mut tx = Transaction {
            sender: [1u8; 33],
            receiver: [2u8; 33],
            amount: n,
            tx_type: TransactionType::Transfer,
            timestamp: n,
            id: [0u8; 32],
            signature: [0u8; 64],
        };
        tx.id = tx.compute_id();
        tx
    }

    #[test]
    fn test_small_pushes_accumulate() {
        let mut queue = BundleQueue::new();
        assert!(queue.push(TARGET, tx(1), 0, 10_000).is_none());
        assert!(queue.push(TARGET, tx(2), 0, 10_000).is_none());
        assert_eq!(queue.queued_for(&TARGET), 2);
    }

    #[test]
    fn test_size_cap_triggers_flush() {
        let mut queue = BundleQueue::new();
        // Cap below one encoded transaction forces immediate flush.
        let ready = queue.push(TARGET, tx(1), 0, 1).expect("flushes");
        assert_eq!(ready.transactions.len(), 1);
        assert_eq!(queue.queued_for(&TARGET), 0);
    }

    #[test]
    fn test_timeout_flushes_aged_bundles() {
        let mut queue = BundleQueue::new();
        queue.push(TARGET, tx(1), 1_000, 10_000);
        assert!(queue.take_due(5_000, 10_000).is_empty());
        let due = queue.take_due(11_000, 10_000);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].target, TARGET);
    }

    #[test]
    fn test_retain_targets_drops_expired_leaders() {
        let mut queue = BundleQueue::new();
        let other: PublicKey = [8u8; 33];
        queue.push(TARGET, tx(1), 0, 10_000);
        queue.push(other, tx(2), 0, 10_000);
        let dropped = queue.retain_targets(&[TARGET]);
        assert_eq!(dropped, 1);
        assert_eq!(queue.targets(), 1);
        assert_eq!(queue.queued_for(&other), 0);
    }

    #[test]
    fn test_bundle_order_preserved() {
        let mut queue = BundleQueue::new();
        queue.push(TARGET, tx(1), 0, 10_000);
        queue.push(TARGET, tx(2), 0, 10_000);
        let due = queue.take_due(20_000, 10_000);
        let amounts: Vec<u64> = due[0].transactions.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1, 2]);
    }
}
