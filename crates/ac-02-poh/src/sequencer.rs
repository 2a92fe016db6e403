//! The continuous hash loop.
//!
//! Runs on a dedicated thread; the loop never blocks on I/O. Ingestion
//! goes through a lock-protected queue that the loop drains one id per
//! tick, so transaction entries interleave with empty clock ticks.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use shared_crypto::sha256_hash_many;
use shared_types::time::unix_micros;
use shared_types::{Hash, PohEntry};

use crate::config::PohConfig;

/// Sequencer counters.
#[derive(Debug, Clone, Default)]
pub struct PohStats {
    pub total_ticks: u64,
    pub transactions_sequenced: u64,
    pub entries_in_memory: usize,
    /// EMA of the observed tick interval, seconds.
    pub average_tick_interval: f64,
}

struct PohState {
    current_hash: Hash,
    tick_count: u64,
    entries: VecDeque<PohEntry>,
    pending: VecDeque<Hash>,
    stats: PohStats,
}

impl PohState {
    fn advance(&mut self, tx_id: Option<Hash>, config: &PohConfig) -> PohEntry {
        self.current_hash = match &tx_id {
            Some(id) => sha256_hash_many(&[&self.current_hash, id]),
            None => sha256_hash_many(&[&self.current_hash]),
        };
        self.tick_count += 1;
        self.stats.total_ticks += 1;
        if tx_id.is_some() {
            self.stats.transactions_sequenced += 1;
        }

        let entry = PohEntry {
            hash: self.current_hash,
            tick: self.tick_count,
            tx_id,
            timestamp: unix_micros(),
        };
        self.entries.push_back(entry.clone());

        if self.entries.len() > config.max_entries {
            let drop = config.max_entries / config.trim_divisor.max(1);
            self.entries.drain(..drop);
            debug!(dropped = drop, "trimmed oldest sequencer entries");
        }
        self.stats.entries_in_memory = self.entries.len();
        entry
    }
}

/// Continuously ticking PoH generator.
pub struct PohSequencer {
    config: PohConfig,
    state: Arc<Mutex<PohState>>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PohSequencer {
    /// Create a sequencer anchored at `genesis_hash`.
    pub fn new(config: PohConfig, genesis_hash: Hash) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(PohState {
                current_hash: genesis_hash,
                tick_count: 0,
                entries: VecDeque::new(),
                pending: VecDeque::new(),
                stats: PohStats::default(),
            })),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Begin continuous ticking on a dedicated thread.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("sequencer already running");
            return;
        }

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let interval = config.tick_interval();

        let handle = std::thread::Builder::new()
            .name("poh-sequencer".to_string())
            .spawn(move || {
                let mut last_tick = std::time::Instant::now();
                while running.load(Ordering::SeqCst) {
                    let started = std::time::Instant::now();
                    {
                        let mut guard = state.lock();
                        let next_tx = guard.pending.pop_front();
                        guard.advance(next_tx, &config);

                        let actual = last_tick.elapsed().as_secs_f64();
                        let ema = guard.stats.average_tick_interval;
                        guard.stats.average_tick_interval = ema * 0.9 + actual * 0.1;
                    }
                    last_tick = std::time::Instant::now();

                    let elapsed = started.elapsed();
                    if elapsed < interval {
                        std::thread::sleep(interval - elapsed);
                    }
                }
            })
            .expect("sequencer thread spawn cannot fail");

        *self.thread.lock() = Some(handle);
        info!(
            ticks_per_second = self.config.ticks_per_second,
            "sequencer started"
        );
    }

    /// Stop the loop and join the thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
        info!("sequencer stopped");
    }

    /// Queue a transaction id; the next tick mixes it into the chain.
    pub fn ingest(&self, tx_id: Hash) {
        self.state.lock().pending.push_back(tx_id);
    }

    /// Advance one tick synchronously, mixing the oldest pending id if
    /// any. Used when sealing a block and in tests.
    pub fn tick(&self) -> PohEntry {
        let mut guard = self.state.lock();
        let next_tx = guard.pending.pop_front();
        guard.advance(next_tx, &self.config)
    }

    /// Re-anchor the chain, used at block creation so the block's
    /// segment continues from the parent's last PoH hash.
    pub fn reset(&self, seed: Hash) {
        let mut guard = self.state.lock();
        guard.current_hash = seed;
        guard.pending.clear();
    }

    /// Produce the PoH segment for a block: anchor to the parent's last
    /// hash, then mix every transaction id in order. An empty id list
    /// yields a single clock tick so the segment still advances the
    /// chain.
    pub fn seal_segment(&self, anchor: Hash, tx_ids: &[Hash]) -> Vec<PohEntry> {
        let mut guard = self.state.lock();
        guard.current_hash = anchor;
        guard.pending.clear();

        if tx_ids.is_empty() {
            return vec![guard.advance(None, &self.config)];
        }
        tx_ids
            .iter()
            .map(|id| guard.advance(Some(*id), &self.config))
            .collect()
    }

    /// Entries with tick in `(tick_lo, tick_hi]`.
    pub fn snapshot_since(&self, tick_lo: u64, tick_hi: u64) -> Vec<PohEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.tick > tick_lo && e.tick <= tick_hi)
            .cloned()
            .collect()
    }

    pub fn current_hash(&self) -> Hash {
        self.state.lock().current_hash
    }

    pub fn current_tick(&self) -> u64 {
        self.state.lock().tick_count
    }

    pub fn stats(&self) -> PohStats {
        self.state.lock().stats.clone()
    }
}

impl Drop for PohSequencer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
