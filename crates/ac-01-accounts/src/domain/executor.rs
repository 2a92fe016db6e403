//! Parallel batch execution.
//!
//! Batches come out of the conflict scheduler; within a batch every
//! transaction touches disjoint accounts, so the pool runs them
//! concurrently. Batches commit one after another, which keeps the
//! partial order of conflicting transactions intact.

use rayon::prelude::*;
use tracing::{debug, warn};

use shared_types::time::unix_micros;
use shared_types::{ExecutionMetadata, Transaction, TransactionType};

use super::conflicts::schedule_batches;
use super::entities::{TxOutcome, TxResult};
use super::errors::AccountError;
use super::state::AccountState;

/// Batches smaller than this run on the calling thread; forking the
/// pool costs more than it saves.
const PARALLEL_THRESHOLD: usize = 4;

/// Default worker pool size.
pub const DEFAULT_WORKERS: usize = 32;

/// Result of executing one block's worth of transactions.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Per-transaction outcomes, in input order.
    pub results: Vec<TxResult>,
    /// Batch partitioning and timing, recorded on the block.
    pub metadata: ExecutionMetadata,
}

impl BatchResult {
    /// Count of transactions that mutated state.
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_applied()).count()
    }
}

/// Conflict-free parallel executor over an [`AccountState`].
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
}

impl ParallelExecutor {
    /// Build with an explicit worker count.
    pub fn new(workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("tx-exec-{i}"))
            .build()
            .expect("executor pool construction cannot fail with valid size");
        Self { pool }
    }

    /// Build with [`DEFAULT_WORKERS`] capped at the host's parallelism.
    pub fn with_defaults() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_WORKERS);
        Self::new(DEFAULT_WORKERS.min(cores))
    }

    /// Execute `txs` against `state`: partition into conflict-free
    /// batches, run each batch in parallel, commit batches in order.
    /// A failing transaction is skipped and reported, never fatal.
    pub fn execute_batch(&self, state: &AccountState, txs: &[Transaction]) -> BatchResult {
        let started = unix_micros();
        let batches = schedule_batches(txs);

        let mut outcomes: Vec<Option<TxOutcome>> = vec![None; txs.len()];
        for batch in &batches {
            let batch_outcomes: Vec<(u32, TxOutcome)> = if batch.len() < PARALLEL_THRESHOLD {
                batch
                    .iter()
                    .map(|&i| (i, apply_transaction(state, &txs[i as usize])))
                    .collect()
            } else {
                self.pool.install(|| {
                    batch
                        .par_iter()
                        .map(|&i| (i, apply_transaction(state, &txs[i as usize])))
                        .collect()
                })
            };
            for (i, outcome) in batch_outcomes {
                outcomes[i as usize] = Some(outcome);
            }
        }

        let results: Vec<TxResult> = txs
            .iter()
            .zip(outcomes)
            .map(|(tx, outcome)| TxResult {
                tx_id: tx.id,
                outcome: outcome.expect("every scheduled transaction was executed"),
            })
            .collect();

        let failed = results.len() - results.iter().filter(|r| r.outcome.is_applied()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "batch executed with failures");
        } else {
            debug!(
                total = results.len(),
                batches = batches.len(),
                "batch executed"
            );
        }

        BatchResult {
            results,
            metadata: ExecutionMetadata {
                batches,
                execution_time_us: unix_micros().saturating_sub(started),
            },
        }
    }
}

fn apply_transaction(state: &AccountState, tx: &Transaction) -> TxOutcome {
    let result = match tx.tx_type {
        TransactionType::Transfer => state.transfer(&tx.sender, &tx.receiver, tx.amount),
        // The pipeline has already checked the sender is the faucet key.
        TransactionType::Exchange => state.credit(&tx.receiver, tx.amount),
    };
    match result {
        Ok(()) => TxOutcome::Applied,
        Err(AccountError::InsufficientBalance { .. }) => TxOutcome::InsufficientBalance,
        Err(AccountError::ZeroAmount) => TxOutcome::ZeroAmount,
        Err(AccountError::UnknownSender(_)) => TxOutcome::UnknownSender,
    }
}
