//! The local transaction pool.
//!
//! One logical pool with two ingress paths: local submission and the
//! TPU listener. Arrival order is preserved, ids are deduplicated, and
//! the oldest entry is evicted at capacity. The leader drains the whole
//! pool when its slot starts.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

use shared_types::{Hash, Transaction};

use crate::config::GulfStreamConfig;
use crate::errors::MempoolError;

#[derive(Debug, Default)]
struct PoolInner {
    queue: VecDeque<Transaction>,
    ids: HashSet<Hash>,
    /// Ids of transactions that passed through recently, including
    /// drained ones; resubmissions are no-ops.
    recent: HashSet<Hash>,
    recent_order: VecDeque<Hash>,
}

/// Bounded, arrival-ordered, deduplicating transaction pool.
#[derive(Debug)]
pub struct Mempool {
    config: GulfStreamConfig,
    inner: Mutex<PoolInner>,
}

impl Mempool {
    pub fn new(config: GulfStreamConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(GulfStreamConfig::default())
    }

    /// Insert a validated transaction. Duplicates (by id, including
    /// recently drained ids) are rejected; at capacity the oldest
    /// pending entry is evicted to make room.
    pub fn insert(&self, tx: Transaction) -> Result<(), MempoolError> {
        let mut inner = self.inner.lock();
        if inner.recent.contains(&tx.id) {
            return Err(MempoolError::Duplicate(tx.id));
        }

        if inner.queue.len() >= self.config.mempool_capacity {
            if let Some(evicted) = inner.queue.pop_front() {
                inner.ids.remove(&evicted.id);
                warn!(evicted = %evicted.short_id(), "mempool full, evicted oldest");
            }
        }

        remember(&mut inner, tx.id, self.config.dedup_capacity);
        inner.ids.insert(tx.id);
        inner.queue.push_back(tx);
        Ok(())
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.inner.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Take everything, preserving arrival order. Drained ids stay in
    /// the dedup window so a replayed datagram cannot reinsert them.
    pub fn drain_all(&self) -> Vec<Transaction> {
        let mut inner = self.inner.lock();
        inner.ids.clear();
        let drained: Vec<Transaction> = inner.queue.drain(..).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "mempool drained for block");
        }
        drained
    }

    /// Drop specific transactions, e.g. ones observed in a received
    /// block.
    pub fn remove(&self, ids: &[Hash]) {
        let mut inner = self.inner.lock();
        for id in ids {
            inner.ids.remove(id);
        }
        inner.queue.retain(|tx| !ids.contains(&tx.id));
    }
}

fn remember(inner: &mut PoolInner, id: Hash, capacity: usize) {
    if inner.recent_order.len() >= capacity {
        if let Some(old) = inner.recent_order.pop_front() {
            inner.recent.remove(&old);
        }
    }
    inner.recent.insert(id);
    inner.recent_order.push_back(id);
}
