//! Slot-boundary block production.
//!
//! A timer task wakes at every slot boundary, rolls the schedule across
//! epoch edges, re-forms the Turbine tree for the slot's leader, and,
//! when this node holds the slot, packs everything available into a
//! block and hands it to propagation.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use ac_02_poh::PohSequencer;
use ac_03_consensus::NodeRegistry;
use ac_04_leader_schedule::LeaderSchedule;
use ac_05_gulf_stream::Mempool;
use ac_06_block_pipeline::BlockPipeline;
use ac_07_turbine::{FanoutTree, TurbineService};
use shared_crypto::{sha256_hash, P256KeyPair};
use shared_types::time::unix_micros;
use shared_types::PublicKey;

/// Drives block production at slot boundaries.
pub struct SlotProducer {
    identity: PublicKey,
    keypair: Arc<P256KeyPair>,
    schedule: Arc<LeaderSchedule>,
    mempool: Arc<Mempool>,
    poh: Arc<PohSequencer>,
    pipeline: Arc<BlockPipeline>,
    turbine: Arc<TurbineService>,
    registry: Arc<NodeRegistry>,
    fanout: usize,
    last_produced_slot: Option<u64>,
}

impl SlotProducer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: PublicKey,
        keypair: Arc<P256KeyPair>,
        schedule: Arc<LeaderSchedule>,
        mempool: Arc<Mempool>,
        poh: Arc<PohSequencer>,
        pipeline: Arc<BlockPipeline>,
        turbine: Arc<TurbineService>,
        registry: Arc<NodeRegistry>,
        fanout: usize,
    ) -> Self {
        Self {
            identity,
            keypair,
            schedule,
            mempool,
            poh,
            pipeline,
            turbine,
            registry,
            fanout,
            last_produced_slot: None,
        }
    }

    /// Run until shutdown.
    pub fn spawn(mut self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let wait = self.time_to_next_slot_us();
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_micros(wait)) => {
                        self.on_slot_boundary().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("slot producer stopped");
        })
    }

    fn time_to_next_slot_us(&self) -> u64 {
        let slot_len = self.schedule.config().slot_duration_us;
        let now = unix_micros();
        // Small cushion past the boundary so the slot index has flipped.
        slot_len - (now % slot_len) + 1_000
    }

    async fn on_slot_boundary(&mut self) {
        let now = unix_micros();

        // Every node agrees on this seed: the head block id hashed.
        let head = self.pipeline.head();
        let epoch_seed = sha256_hash(&head.id);
        self.schedule.rollover_if_needed(now, epoch_seed);

        let slot = self.schedule.absolute_slot(now);
        let Some(leader) = self.schedule.current_leader(now) else {
            return;
        };

        // Re-form the fanout tree around the slot's leader.
        self.turbine.update_tree(FanoutTree::build(
            leader,
            &self.registry.suitability_scores(now),
            self.fanout,
        ));

        if leader != self.identity || self.last_produced_slot == Some(slot) {
            return;
        }
        self.last_produced_slot = Some(slot);
        self.produce(now).await;
    }

    async fn produce(&self, now_us: u64) {
        // Everything available gets packed; no size cap.
        let candidates = self.mempool.drain_all();
        let count = candidates.len();
        let block = self
            .pipeline
            .propose(&self.keypair, candidates, &self.poh, now_us);

        match self.pipeline.process_block(block.clone(), now_us) {
            Ok(_) => {
                info!(height = block.height, transactions = count, "slot block produced");
                if let Err(e) = self.turbine.broadcast_block(&block).await {
                    error!(error = %e, "block broadcast failed");
                }
            }
            Err(e) => {
                // Own block failing commit is an internal invariant
                // breach, not peer input.
                error!(error = %e, "own block rejected");
            }
        }
    }
}
