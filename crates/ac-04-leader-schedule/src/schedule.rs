//! Epoch table generation.

use ac_03_consensus::CandidateSelector;
use shared_crypto::sha256_hash_many;
use shared_types::{Hash, PublicKey};

use crate::config::ScheduleConfig;

/// Seed for one slot's selection round.
pub fn per_slot_seed(epoch: u64, slot: u64, vrf_output: &Hash) -> Hash {
    sha256_hash_many(&[&epoch.to_le_bytes(), &slot.to_le_bytes(), vrf_output])
}

/// One epoch's slot → leader table.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSchedule {
    pub epoch: u64,
    /// VRF output the table was generated from.
    pub seed: Hash,
    /// Leader per slot index.
    pub slots: Vec<PublicKey>,
}

impl EpochSchedule {
    /// Generate the table for `epoch` by running one selection round
    /// per slot. Returns `None` when the selector has no active nodes.
    pub fn generate(
        selector: &CandidateSelector,
        config: &ScheduleConfig,
        epoch: u64,
        vrf_output: Hash,
        now_us: u64,
    ) -> Option<Self> {
        let slots: Option<Vec<PublicKey>> = (0..config.slots_per_epoch)
            .map(|slot| {
                let seed = per_slot_seed(epoch, slot, &vrf_output);
                selector.select_representative(&seed, now_us)
            })
            .collect();
        slots.map(|slots| Self {
            epoch,
            seed: vrf_output,
            slots,
        })
    }

    pub fn leader_at(&self, slot: u64) -> Option<&PublicKey> {
        self.slots.get(slot as usize)
    }

    /// Distinct leaders in the table.
    pub fn distinct_leaders(&self) -> usize {
        let mut seen: Vec<&PublicKey> = Vec::new();
        for leader in &self.slots {
            if !seen.contains(&leader) {
                seen.push(leader);
            }
        }
        seen.len()
    }
}
