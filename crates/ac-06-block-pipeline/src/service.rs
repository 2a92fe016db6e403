//! The commit path.
//!
//! One pipeline instance per node owns the chain store and the live
//! account state. Received blocks (and the leader's own) all pass
//! through [`BlockPipeline::process_block`]; a single consumer task
//! drains the inbound channel so append order is preserved.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ac_01_accounts::{AccountState, ParallelExecutor, Snapshot};
use ac_02_poh::PohSequencer;
use ac_03_consensus::NodeRegistry;
use ac_04_leader_schedule::LeaderSchedule;
use ac_05_gulf_stream::Mempool;
use shared_crypto::P256KeyPair;
use shared_types::time::unix_micros;
use shared_types::{Block, BlockHeaderView, Hash, PublicKey, Transaction};

use crate::config::PipelineConfig;
use crate::domain::chain::ChainState;
use crate::domain::errors::BlockError;
use crate::domain::proposer::create_block;
use crate::domain::validation::{validate_block, ValidationContext};

/// Chain, state, and the validation machinery of one node.
pub struct BlockPipeline {
    config: PipelineConfig,
    chain: RwLock<ChainState>,
    state: Arc<AccountState>,
    executor: ParallelExecutor,
    faucet: PublicKey,
    genesis_snapshot: Snapshot,
    registry: Option<Arc<NodeRegistry>>,
    schedule: Option<Arc<LeaderSchedule>>,
    mempool: Option<Arc<Mempool>>,
}

impl BlockPipeline {
    /// Build from the genesis block and its account state.
    pub fn new(
        config: PipelineConfig,
        genesis: Block,
        genesis_state: AccountState,
        faucet: PublicKey,
        executor: ParallelExecutor,
    ) -> Self {
        let genesis_snapshot = genesis_state.snapshot();
        Self {
            config,
            chain: RwLock::new(ChainState::new(genesis)),
            state: Arc::new(genesis_state),
            executor,
            faucet,
            genesis_snapshot,
            registry: None,
            schedule: None,
            mempool: None,
        }
    }

    /// Wire the consensus registry so proposal outcomes feed scoring.
    pub fn with_registry(mut self, registry: Arc<NodeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Wire the leader schedule so reception checks the scheduled
    /// leader.
    pub fn with_schedule(mut self, schedule: Arc<LeaderSchedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Wire the mempool so committed transactions leave the pool.
    pub fn with_mempool(mut self, mempool: Arc<Mempool>) -> Self {
        self.mempool = Some(mempool);
        self
    }

    pub fn state(&self) -> &Arc<AccountState> {
        &self.state
    }

    pub fn head(&self) -> BlockHeaderView {
        self.chain.read().head().header()
    }

    pub fn height(&self) -> u64 {
        self.chain.read().height()
    }

    pub fn block_count(&self) -> usize {
        self.chain.read().block_count()
    }

    pub fn get_block(&self, id: &Hash) -> Option<Block> {
        self.chain.read().get(id).cloned()
    }

    /// Leader path: pack `candidates` on top of the current head and
    /// sign. The block still goes through [`Self::process_block`] to
    /// commit, so leaders and validators share one code path.
    pub fn propose(
        &self,
        keypair: &P256KeyPair,
        candidates: Vec<Transaction>,
        poh: &PohSequencer,
        now_us: u64,
    ) -> Block {
        let (parent, anchor) = {
            let chain = self.chain.read();
            let head = chain.head().clone();
            let anchor = chain
                .poh_anchor(&chain.head_id())
                .expect("head always has an anchor");
            (head, anchor)
        };
        let parent_state = self.state_at(&parent.id()).expect("head state derivable");
        create_block(
            keypair,
            &parent,
            anchor,
            candidates,
            poh,
            &self.executor,
            parent_state,
            &self.faucet,
            now_us,
        )
    }

    /// Validate and commit a block. Returns `true` when the chain head
    /// moved. Failures discard the block and charge the advertised
    /// proposer's failure counter.
    pub fn process_block(&self, block: Block, now_us: u64) -> Result<bool, BlockError> {
        let proposer = block.proposer;
        let tx_count = block.transactions.len() as u64;

        let result = self.try_process(block, now_us);
        match &result {
            Ok(_) => self.record_proposal(&proposer, true, tx_count, now_us),
            Err(BlockError::Duplicate) => {}
            Err(error) => {
                warn!(%error, "block rejected");
                self.record_proposal(&proposer, false, 0, now_us);
            }
        }
        result
    }

    fn try_process(&self, block: Block, now_us: u64) -> Result<bool, BlockError> {
        let block_id = block.id();
        let (parent_id, parent_height, anchor) = {
            let chain = self.chain.read();
            if chain.has_block(&block_id) {
                return Err(BlockError::Duplicate);
            }
            let parent = chain.get(&block.prev_hash).ok_or(BlockError::UnknownParent)?;
            (
                parent.id(),
                parent.height,
                chain.poh_anchor(&block.prev_hash).expect("parent present"),
            )
        };

        let parent_state = self
            .state_at(&parent_id)
            .ok_or(BlockError::UnknownParent)?;
        let expected_leader = self
            .schedule
            .as_ref()
            .and_then(|s| s.scheduled_leader_at(block.timestamp));

        let post_state = validate_block(
            &block,
            ValidationContext {
                parent_id,
                parent_height,
                poh_anchor: anchor,
                expected_leader,
                parent_state,
                faucet: self.faucet,
            },
            &self.executor,
            &self.config,
            now_us,
        )?;

        let committed_ids: Vec<Hash> = block.transactions.iter().map(|tx| tx.id).collect();
        let height = block.height;

        let head_moved = {
            let mut chain = self.chain.write();
            let moved = chain.insert(block);
            if moved {
                if chain.head_id() == block_id {
                    self.state.restore(post_state);
                } else {
                    // Fork choice picked a different branch; rebuild the
                    // live state along the new head's path.
                    let rebuilt = self
                        .state_at_locked(&chain, &chain.head_id())
                        .expect("head path known");
                    self.state.restore(rebuilt);
                }
            }
            moved
        };

        if head_moved {
            if let Some(mempool) = &self.mempool {
                mempool.remove(&committed_ids);
            }
            info!(height, txs = committed_ids.len(), "block committed");
        }
        Ok(head_moved)
    }

    /// Account state after `block_id`, replayed from genesis when the
    /// block is off the live head.
    pub fn state_at(&self, block_id: &Hash) -> Option<Snapshot> {
        let chain = self.chain.read();
        if *block_id == chain.head_id() {
            return Some(self.state.snapshot());
        }
        self.state_at_locked(&chain, block_id)
    }

    fn state_at_locked(&self, chain: &ChainState, block_id: &Hash) -> Option<Snapshot> {
        let path = chain.path_from_genesis(block_id)?;
        let replay = AccountState::from_snapshot(self.genesis_snapshot.clone());
        for block in path {
            self.executor.execute_batch(&replay, &block.transactions);
        }
        Some(replay.snapshot())
    }

    fn record_proposal(&self, proposer: &PublicKey, success: bool, tx_count: u64, now_us: u64) {
        if let Some(registry) = &self.registry {
            registry.record_proposal(proposer, success, tx_count, now_us);
        }
    }

    /// Single consumer preserving append order for blocks arriving from
    /// propagation.
    pub fn spawn_consumer(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Block>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(block) = rx.recv().await {
                let _ = self.process_block(block, unix_micros());
            }
        })
    }
}
