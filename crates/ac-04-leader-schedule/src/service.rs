//! The slot clock and the concurrently held current/next tables.
//!
//! Read-mostly: every forwarder lookup takes the read lock; the writer
//! swaps in a new epoch atomically at rollover. After bootstrap the
//! "next schedule ready" invariant holds at all times.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use ac_03_consensus::CandidateSelector;
use shared_types::{Hash, PublicKey};

use crate::config::ScheduleConfig;
use crate::schedule::EpochSchedule;

/// One upcoming slot: absolute index, its leader, and when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub slot: u64,
    pub leader: PublicKey,
    pub start_time_us: u64,
}

/// Snapshot for monitoring and bootstrap checks.
#[derive(Debug, Clone)]
pub struct ScheduleInfo {
    pub current_epoch: u64,
    pub current_slot: u64,
    pub slots_per_epoch: u64,
    pub current_slots: usize,
    pub next_slots: usize,
}

struct State {
    current: EpochSchedule,
    next: EpochSchedule,
    /// Wall-clock start of the current epoch.
    epoch_start_us: u64,
}

/// Concurrent view over the current and pre-computed next epoch.
pub struct LeaderSchedule {
    config: ScheduleConfig,
    selector: Arc<CandidateSelector>,
    state: RwLock<State>,
}

impl LeaderSchedule {
    /// Assemble from already generated tables. `next.epoch` must be
    /// `current.epoch + 1`.
    pub fn new(
        config: ScheduleConfig,
        selector: Arc<CandidateSelector>,
        current: EpochSchedule,
        next: EpochSchedule,
        epoch_start_us: u64,
    ) -> Self {
        debug_assert_eq!(next.epoch, current.epoch + 1);
        Self {
            config,
            selector,
            state: RwLock::new(State {
                current,
                next,
                epoch_start_us,
            }),
        }
    }

    /// Generate epoch 0 and epoch 1 from the genesis VRF output and
    /// start the clock at `epoch_start_us`.
    pub fn bootstrap(
        config: ScheduleConfig,
        selector: Arc<CandidateSelector>,
        vrf_output: Hash,
        epoch_start_us: u64,
    ) -> Option<Self> {
        let current =
            EpochSchedule::generate(&selector, &config, 0, vrf_output, epoch_start_us)?;
        let next = EpochSchedule::generate(&selector, &config, 1, vrf_output, epoch_start_us)?;
        info!(
            slots = config.slots_per_epoch,
            slot_ms = config.slot_duration_us / 1_000,
            "leader schedule bootstrapped"
        );
        Some(Self::new(config, selector, current, next, epoch_start_us))
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Slot index within the current epoch, clamped to the last slot
    /// until rollover runs.
    pub fn current_slot(&self, now_us: u64) -> u64 {
        let state = self.state.read();
        let elapsed = now_us.saturating_sub(state.epoch_start_us);
        (elapsed / self.config.slot_duration_us).min(self.config.slots_per_epoch - 1)
    }

    /// Absolute slot index since genesis.
    pub fn absolute_slot(&self, now_us: u64) -> u64 {
        let state = self.state.read();
        state.current.epoch * self.config.slots_per_epoch
            + {
                let elapsed = now_us.saturating_sub(state.epoch_start_us);
                (elapsed / self.config.slot_duration_us).min(self.config.slots_per_epoch - 1)
            }
    }

    /// Leader of the current slot.
    pub fn current_leader(&self, now_us: u64) -> Option<PublicKey> {
        let slot = self.current_slot(now_us);
        self.state.read().current.leader_at(slot).copied()
    }

    /// The next `k` slots after the current one, with leaders and start
    /// times. Stops at the end of the pre-computed horizon.
    pub fn upcoming_leaders(&self, k: u64, now_us: u64) -> Vec<SlotView> {
        let state = self.state.read();
        let spe = self.config.slots_per_epoch;
        let elapsed = now_us.saturating_sub(state.epoch_start_us);
        let current_in_epoch = (elapsed / self.config.slot_duration_us).min(spe - 1);

        (1..=k)
            .filter_map(|offset| {
                let in_epoch = current_in_epoch + offset;
                let (table, slot_in_epoch) = if in_epoch < spe {
                    (&state.current, in_epoch)
                } else if in_epoch < 2 * spe {
                    (&state.next, in_epoch - spe)
                } else {
                    return None;
                };
                table.leader_at(slot_in_epoch).map(|leader| SlotView {
                    slot: table.epoch * spe + slot_in_epoch,
                    leader: *leader,
                    start_time_us: state.epoch_start_us
                        + in_epoch * self.config.slot_duration_us,
                })
            })
            .collect()
    }

    /// Forwarding fanout: the current leader plus the next three
    /// distinct upcoming leaders, at most four targets.
    pub fn gulf_stream_targets(&self, now_us: u64) -> Vec<PublicKey> {
        let mut targets = Vec::new();
        if let Some(current) = self.current_leader(now_us) {
            targets.push(current);
        }
        for view in self.upcoming_leaders(self.config.slots_per_epoch, now_us) {
            if targets.len() >= 4 {
                break;
            }
            if !targets.contains(&view.leader) {
                targets.push(view.leader);
            }
        }
        targets.truncate(4);
        targets
    }

    /// Scheduled leader for the slot containing `timestamp_us`, when
    /// the pre-computed horizon (current plus next epoch) covers it.
    /// Used by block reception to check the proposer.
    pub fn scheduled_leader_at(&self, timestamp_us: u64) -> Option<PublicKey> {
        let state = self.state.read();
        if timestamp_us < state.epoch_start_us {
            return None;
        }
        let offset =
            (timestamp_us - state.epoch_start_us) / self.config.slot_duration_us;
        let spe = self.config.slots_per_epoch;
        if offset < spe {
            state.current.leader_at(offset).copied()
        } else if offset < 2 * spe {
            state.next.leader_at(offset - spe).copied()
        } else {
            None
        }
    }

    /// True once the next epoch's table exists; holds continuously
    /// after bootstrap.
    pub fn next_ready(&self) -> bool {
        !self.state.read().next.slots.is_empty()
    }

    /// Advance past any completed epochs. The pre-computed next table
    /// becomes current and a fresh next is generated from `vrf_output`
    /// (derived from recent chain state). Returns the number of epochs
    /// rolled.
    pub fn rollover_if_needed(&self, now_us: u64, vrf_output: Hash) -> usize {
        let mut rolled = 0;
        loop {
            let (epoch_end, next_epoch) = {
                let state = self.state.read();
                (
                    state.epoch_start_us + self.config.epoch_duration_us(),
                    state.next.epoch,
                )
            };
            if now_us < epoch_end {
                break;
            }

            let replacement = EpochSchedule::generate(
                &self.selector,
                &self.config,
                next_epoch + 1,
                vrf_output,
                now_us,
            );
            let Some(replacement) = replacement else {
                warn!("no active nodes; keeping previous schedule");
                break;
            };

            let mut state = self.state.write();
            let finished_next = std::mem::replace(&mut state.next, replacement);
            state.current = finished_next;
            state.epoch_start_us = epoch_end;
            rolled += 1;
            info!(epoch = state.current.epoch, "rolled into new epoch");
        }
        rolled
    }

    pub fn info(&self, now_us: u64) -> ScheduleInfo {
        let slot = self.current_slot(now_us);
        let state = self.state.read();
        ScheduleInfo {
            current_epoch: state.current.epoch,
            current_slot: slot,
            slots_per_epoch: self.config.slots_per_epoch,
            current_slots: state.current.slots.len(),
            next_slots: state.next.slots.len(),
        }
    }
}
