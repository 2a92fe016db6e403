//! Full block validation on reception.
//!
//! Order of checks mirrors cost: structure first, signatures next, PoH
//! continuity, then re-execution against a snapshot of the parent
//! state. A block passes iff the recomputed state root matches the one
//! it advertises.

use ac_01_accounts::{schedule_batches, AccountState, ParallelExecutor, Snapshot};
use ac_02_poh::verify_anchored;
use ac_05_gulf_stream::verify_transaction;
use shared_crypto::ecdsa::verify_raw;
use shared_types::time::unix_micros;
use shared_types::{Block, Hash, PublicKey, TransactionType};

use crate::config::PipelineConfig;
use crate::domain::errors::BlockError;

/// Everything validation needs about the block's position in the chain.
pub struct ValidationContext {
    /// The parent's block id; must equal `block.prev_hash`.
    pub parent_id: Hash,
    pub parent_height: u64,
    /// Anchor for the block's PoH segment.
    pub poh_anchor: Hash,
    /// Scheduled leader of the block's slot, when the schedule covers
    /// it.
    pub expected_leader: Option<PublicKey>,
    /// Account state after the parent block.
    pub parent_state: Snapshot,
    /// The only key allowed to sign Exchange transactions.
    pub faucet: PublicKey,
}

/// Validate `block` and return the post-state snapshot on success.
pub fn validate_block(
    block: &Block,
    ctx: ValidationContext,
    executor: &ParallelExecutor,
    config: &PipelineConfig,
    now_us: u64,
) -> Result<Snapshot, BlockError> {
    let started = unix_micros();

    // Structure.
    if block.prev_hash != ctx.parent_id {
        return Err(BlockError::UnknownParent);
    }
    if block.height != ctx.parent_height + 1 {
        return Err(BlockError::HeightMismatch {
            height: block.height,
            parent_height: ctx.parent_height,
        });
    }
    if let Some(leader) = ctx.expected_leader {
        if block.proposer != leader {
            return Err(BlockError::NotScheduledLeader);
        }
    }
    if now_us.abs_diff(block.timestamp) > config.max_timestamp_skew_us {
        return Err(BlockError::TimestampSkew);
    }

    // Proposer signature over the canonical payload.
    if !verify_raw(&block.proposer, &block.canonical_payload(), &block.signature) {
        return Err(BlockError::BadSignature);
    }

    // Transactions: signatures, in-block uniqueness, faucet discipline.
    let mut seen: Vec<Hash> = Vec::with_capacity(block.transactions.len());
    for tx in &block.transactions {
        if verify_transaction(tx).is_err() {
            return Err(BlockError::BadTransaction(tx.short_id()));
        }
        if tx.tx_type == TransactionType::Exchange && tx.sender != ctx.faucet {
            return Err(BlockError::FaucetViolation);
        }
        if seen.contains(&tx.id) {
            return Err(BlockError::DuplicateTransaction);
        }
        seen.push(tx.id);
    }

    // PoH: continuous from the parent's last hash, and sealing exactly
    // the block's transactions in order.
    if !verify_anchored(&ctx.poh_anchor, &block.poh) {
        return Err(BlockError::BadPoh);
    }
    let sealed: Vec<Hash> = block.poh.iter().filter_map(|e| e.tx_id).collect();
    if sealed != seen {
        return Err(BlockError::PohOrderMismatch);
    }

    // The advertised partitioning must be the one the conflict graph
    // yields.
    if block.execution.batches != schedule_batches(&block.transactions) {
        return Err(BlockError::BatchMismatch);
    }

    // Re-execute on a detached copy of the parent state.
    let replay = AccountState::from_snapshot(ctx.parent_state);
    executor.execute_batch(&replay, &block.transactions);
    if replay.state_root() != block.state_root {
        return Err(BlockError::StateRootMismatch);
    }

    if unix_micros().saturating_sub(started) > config.verify_budget_us {
        return Err(BlockError::VerifyTimeout {
            budget_us: config.verify_budget_us,
        });
    }

    Ok(replay.snapshot())
}
