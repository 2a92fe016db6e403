//! In-memory shred accumulation per block id.

use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use shared_types::{Hash, Shred};

use crate::config::TurbineConfig;
use crate::shred::reconstruct_block_bytes;

#[derive(Debug, Default)]
struct Entry {
    shreds: HashMap<u32, Shred>,
    num_data: usize,
}

/// Accumulates shreds keyed by block id and reconstructs once enough
/// have arrived. Completed and evicted block ids are remembered so late
/// or replayed shreds are ignored.
#[derive(Debug, Default)]
pub struct ReconstructionBuffer {
    entries: HashMap<Hash, Entry>,
    arrival: VecDeque<Hash>,
    completed: VecDeque<Hash>,
}

impl ReconstructionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a shred. Returns the reconstructed block bytes the first
    /// time the set becomes sufficient.
    pub fn insert(&mut self, shred: Shred, config: &TurbineConfig) -> Option<Vec<u8>> {
        let block_id = shred.block_id;
        if self.completed.contains(&block_id) {
            return None;
        }

        if !self.entries.contains_key(&block_id) {
            self.evict_if_full(config);
            self.entries.insert(block_id, Entry::default());
            self.arrival.push_back(block_id);
        }
        let entry = self.entries.get_mut(&block_id).expect("just inserted");
        entry.num_data = shred.num_data as usize;
        entry.shreds.insert(shred.index, shred);

        if entry.shreds.len() < entry.num_data {
            return None;
        }

        let shreds: Vec<Shred> = entry.shreds.values().cloned().collect();
        match reconstruct_block_bytes(&shreds) {
            Ok(bytes) => {
                self.entries.remove(&block_id);
                self.arrival.retain(|id| *id != block_id);
                self.remember_completed(block_id);
                debug!(
                    block = %hex::encode(&block_id[..4]),
                    bytes = bytes.len(),
                    "block reconstructed"
                );
                Some(bytes)
            }
            Err(error) => {
                // Keep accumulating; parity may still fill the gap.
                warn!(%error, "reconstruction attempt failed");
                None
            }
        }
    }

    /// True once the block was fully reconstructed.
    pub fn is_complete(&self, block_id: &Hash) -> bool {
        self.completed.contains(block_id)
    }

    pub fn pending_blocks(&self) -> usize {
        self.entries.len()
    }

    pub fn shreds_for(&self, block_id: &Hash) -> usize {
        self.entries
            .get(block_id)
            .map(|e| e.shreds.len())
            .unwrap_or(0)
    }

    fn evict_if_full(&mut self, config: &TurbineConfig) {
        while self.entries.len() >= config.max_buffered_blocks {
            let Some(oldest) = self.arrival.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            warn!(block = %hex::encode(&oldest[..4]), "evicted incomplete block");
        }
    }

    fn remember_completed(&mut self, block_id: Hash) {
        // Bounded memory of finished blocks for replay suppression.
        if self.completed.len() >= 1_024 {
            self.completed.pop_front();
        }
        self.completed.push_back(block_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shred::shred_block_bytes;

    fn config() -> TurbineConfig {
        TurbineConfig::default()
    }

    #[test]
    fn test_reconstructs_when_sufficient() {
        let bytes: Vec<u8> = (0..5_000u32).map(|i| i as u8).collect();
        let shreds = shred_block_bytes([1u8; 32], &bytes, &config()).unwrap();
        let num_data = shreds[0].num_data as usize;

        let mut buffer = ReconstructionBuffer::new();
        let mut result = None;
        for shred in shreds.into_iter().take(num_data) {
            result = buffer.insert(shred, &config());
        }
        assert_eq!(result.unwrap(), bytes);
        assert!(buffer.is_complete(&[1u8; 32]));
    }

    #[test]
    fn test_duplicate_shreds_do_not_complete_early() {
        let bytes = vec![7u8; 5_000];
        let shreds = shred_block_bytes([1u8; 32], &bytes, &config()).unwrap();
        let mut buffer = ReconstructionBuffer::new();
        for _ in 0..10 {
            assert!(buffer.insert(shreds[0].clone(), &config()).is_none());
        }
        assert_eq!(buffer.shreds_for(&[1u8; 32]), 1);
    }

    #[test]
    fn test_late_shreds_after_completion_ignored() {
        let bytes = vec![7u8; 2_000];
        let shreds = shred_block_bytes([1u8; 32], &bytes, &config()).unwrap();
        let mut buffer = ReconstructionBuffer::new();
        let mut reconstructed = 0;
        for shred in shreds.iter().cloned() {
            if buffer.insert(shred, &config()).is_some() {
                reconstructed += 1;
            }
        }
        // Only the first sufficient insert yields the block.
        assert_eq!(reconstructed, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest_incomplete() {
        let config = TurbineConfig {
            max_buffered_blocks: 2,
            ..TurbineConfig::default()
        };
        let mut buffer = ReconstructionBuffer::new();
        for i in 0..3u8 {
            let shreds =
                shred_block_bytes([i; 32], &vec![i; 5_000], &config).unwrap();
            buffer.insert(shreds[0].clone(), &config);
        }
        assert_eq!(buffer.pending_blocks(), 2);
        assert_eq!(buffer.shreds_for(&[0u8; 32]), 0);
    }

    #[test]
    fn test_interleaved_blocks() {
        let config = config();
        let a = shred_block_bytes([1u8; 32], &vec![1u8; 3_000], &config).unwrap();
        let b = shred_block_bytes([2u8; 32], &vec![2u8; 3_000], &config).unwrap();
        let mut buffer = ReconstructionBuffer::new();

        let mut results = Vec::new();
        for (x, y) in a.into_iter().zip(b.into_iter()) {
            if let Some(bytes) = buffer.insert(x, &config) {
                results.push(bytes);
            }
            if let Some(bytes) = buffer.insert(y, &config) {
                results.push(bytes);
            }
        }
        assert_eq!(results.len(), 2);
    }
}
