//! Conflict-graph scheduling.
//!
//! Two transactions conflict iff their account sets intersect. The
//! scheduler assigns each transaction to the earliest batch that follows
//! every earlier conflicting transaction; batches commit sequentially,
//! so the relative order of any conflicting pair is preserved while
//! disjoint transactions share a batch and run concurrently.

use shared_types::{PublicKey, Transaction};
use std::collections::HashMap;

/// Partition `txs` into conflict-free batches of input indices.
///
/// The returned batches are a refinement of the input order: for any two
/// conflicting transactions the earlier one lands in a strictly earlier
/// batch.
pub fn schedule_batches(txs: &[Transaction]) -> Vec<Vec<u32>> {
    let mut batches: Vec<Vec<u32>> = Vec::new();
    // Highest batch index that touched each account so far.
    let mut last_batch_for: HashMap<PublicKey, usize> = HashMap::new();

    for (index, tx) in txs.iter().enumerate() {
        let batch_index = tx
            .account_set()
            .iter()
            .filter_map(|key| last_batch_for.get(key).map(|b| b + 1))
            .max()
            .unwrap_or(0);

        if batch_index == batches.len() {
            batches.push(Vec::new());
        }
        batches[batch_index].push(index as u32);

        for key in tx.account_set() {
            last_batch_for.insert(key, batch_index);
        }
    }

    batches
}

/// True iff the two transactions touch at least one common account.
pub fn conflicts(a: &Transaction, b: &Transaction) -> bool {
    let set_b = b.account_set();
    a.account_set().iter().any(|k| set_b.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransactionType;

    fn tx(sender: u8, receiver: u8) -> Transaction {
        let mut tx = Transaction {
            sender: [sender; 33],
            receiver: [receiver; 33],
            amount: 1,
            tx_type: TransactionType::Transfer,
            timestamp: 0,
            id: [0u8; 32],
            signature: [0u8; 64],
        };
        tx.id = tx.compute_id();
        tx
    }

    #[test]
    fn test_disjoint_txs_share_batch() {
        let txs = vec![tx(1, 2), tx(3, 4), tx(5, 6)];
        let batches = schedule_batches(&txs);
        assert_eq!(batches, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_conflicting_txs_split_in_order() {
        // Second tx spends from the same sender; must run after the first.
        let txs = vec![tx(1, 2), tx(1, 3)];
        let batches = schedule_batches(&txs);
        assert_eq!(batches, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_receiver_overlap_conflicts() {
        let txs = vec![tx(1, 2), tx(3, 2)];
        let batches = schedule_batches(&txs);
        assert_eq!(batches, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_mixed_workload() {
        // 0: a->b, 1: c->d (disjoint), 2: b->c (conflicts with both)
        let txs = vec![tx(1, 2), tx(3, 4), tx(2, 3)];
        let batches = schedule_batches(&txs);
        assert_eq!(batches, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_conflicts_predicate() {
        assert!(conflicts(&tx(1, 2), &tx(2, 3)));
        assert!(!conflicts(&tx(1, 2), &tx(3, 4)));
    }

    #[test]
    fn test_empty_input() {
        assert!(schedule_batches(&[]).is_empty());
    }
}
