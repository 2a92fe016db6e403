//! Chain store and fork choice.
//!
//! Every valid block is retained, keyed by id, with children indexed so
//! paths can be replayed. The head is the block with the greatest
//! height; between equal heights the lower block id wins. No finality
//! gadget: liveness first.

use std::collections::HashMap;
use tracing::info;

use shared_types::{Block, Hash};

/// In-memory block tree.
pub struct ChainState {
    blocks: HashMap<Hash, Block>,
    children: HashMap<Hash, Vec<Hash>>,
    genesis_id: Hash,
    head: Hash,
}

impl ChainState {
    /// Start a chain from its genesis block.
    pub fn new(genesis: Block) -> Self {
        let genesis_id = genesis.id();
        let mut blocks = HashMap::new();
        blocks.insert(genesis_id, genesis);
        Self {
            blocks,
            children: HashMap::new(),
            genesis_id,
            head: genesis_id,
        }
    }

    pub fn genesis_id(&self) -> Hash {
        self.genesis_id
    }

    pub fn has_block(&self, id: &Hash) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn get(&self, id: &Hash) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn head_id(&self) -> Hash {
        self.head
    }

    pub fn head(&self) -> &Block {
        self.blocks.get(&self.head).expect("head always stored")
    }

    pub fn height(&self) -> u64 {
        self.head().height
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Insert a validated block and re-run fork choice. Returns `true`
    /// when the head moved.
    pub fn insert(&mut self, block: Block) -> bool {
        let id = block.id();
        self.children.entry(block.prev_hash).or_default().push(id);
        self.blocks.insert(id, block);

        let best = self.best_head();
        if best != self.head {
            let old = self.head;
            self.head = best;
            info!(
                height = self.height(),
                head = %hex::encode(&best[..4]),
                previous = %hex::encode(&old[..4]),
                "chain head advanced"
            );
            true
        } else {
            false
        }
    }

    /// Greatest height wins; equal heights fall back to the lower id.
    fn best_head(&self) -> Hash {
        let mut best = self.head;
        let mut best_block = &self.blocks[&best];
        for (id, block) in &self.blocks {
            let better = block.height > best_block.height
                || (block.height == best_block.height && *id < best);
            if better {
                best = *id;
                best_block = block;
            }
        }
        best
    }

    /// Blocks from genesis (exclusive) down to `id` (inclusive), in
    /// apply order. `None` if `id` is unknown or detached.
    pub fn path_from_genesis(&self, id: &Hash) -> Option<Vec<&Block>> {
        let mut path = Vec::new();
        let mut cursor = *id;
        while cursor != self.genesis_id {
            let block = self.blocks.get(&cursor)?;
            path.push(block);
            cursor = block.prev_hash;
        }
        path.reverse();
        Some(path)
    }

    /// The anchor a child of `parent_id` must chain its PoH segment to:
    /// the parent's last PoH hash, or the parent id for the PoH-less
    /// genesis block.
    pub fn poh_anchor(&self, parent_id: &Hash) -> Option<Hash> {
        let parent = self.blocks.get(parent_id)?;
        Some(parent.last_poh_hash().unwrap_or(*parent_id))
    }
}
