//! The component arena.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use ac_01_accounts::ParallelExecutor;
use ac_02_poh::PohSequencer;
use ac_03_consensus::{CandidateSelector, NodeRegistry};
use ac_04_leader_schedule::LeaderSchedule;
use ac_05_gulf_stream::verify_transaction;
use ac_05_gulf_stream::{GulfStreamForwarder, Mempool, MempoolError, TpuListener};
use ac_06_block_pipeline::{genesis_block, BlockPipeline};
use ac_07_turbine::{FanoutTree, TurbineService};
use shared_crypto::{sha256_hash, P256KeyPair};
use shared_types::time::unix_micros;
use shared_types::{AddressBook, CoreError, GenesisConfig, PublicKey, Transaction};

use crate::config::NodeConfig;
use crate::slot_producer::SlotProducer;

/// One running node: every subsystem plus the background tasks that
/// drive them.
pub struct Node {
    pub identity: PublicKey,
    pub keypair: Arc<P256KeyPair>,
    pub config: NodeConfig,
    pub address_book: Arc<AddressBook>,
    pub registry: Arc<NodeRegistry>,
    pub schedule: Arc<LeaderSchedule>,
    pub mempool: Arc<Mempool>,
    pub poh: Arc<PohSequencer>,
    pub pipeline: Arc<BlockPipeline>,
    pub forwarder: Arc<GulfStreamForwarder>,
    pub tpu: Arc<TpuListener>,
    pub turbine: Arc<TurbineService>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl Node {
    /// Assemble every subsystem from genesis. The node registers its
    /// own identity in the consensus registry so a single-node network
    /// can bootstrap a schedule.
    pub async fn bootstrap(
        config: NodeConfig,
        keypair: P256KeyPair,
        genesis: &GenesisConfig,
    ) -> anyhow::Result<Self> {
        let identity = *keypair.public_key().as_bytes();
        let now = unix_micros();

        let registry = Arc::new(NodeRegistry::new(config.consensus.clone()));
        registry.register(identity, now);

        let selector = Arc::new(CandidateSelector::new(Arc::clone(&registry)));
        let (genesis_blk, genesis_state) = genesis_block(genesis)?;
        let genesis_id = genesis_blk.id();

        let schedule = Arc::new(
            LeaderSchedule::bootstrap(
                config.schedule,
                Arc::clone(&selector),
                sha256_hash(&genesis_id),
                now,
            )
            .ok_or_else(|| anyhow::anyhow!("no nodes registered for schedule bootstrap"))?,
        );

        let address_book = Arc::new(AddressBook::new());
        let mempool = Arc::new(Mempool::new(config.gulf_stream.clone()));
        let poh = Arc::new(PohSequencer::new(config.poh.clone(), genesis_id));

        let pipeline = Arc::new(
            BlockPipeline::new(
                config.pipeline.clone(),
                genesis_blk,
                genesis_state,
                genesis.faucet_key()?,
                ParallelExecutor::new(config.executor_workers),
            )
            .with_registry(Arc::clone(&registry))
            .with_schedule(Arc::clone(&schedule))
            .with_mempool(Arc::clone(&mempool)),
        );

        let forwarder = Arc::new(
            GulfStreamForwarder::bind(
                identity,
                config.gulf_stream.clone(),
                Arc::clone(&schedule),
                Arc::clone(&address_book),
            )
            .await?,
        );

        let tpu = Arc::new(
            TpuListener::bind(
                &config.ip,
                config.tpu_port,
                config.gulf_stream.clone(),
                Arc::clone(&mempool),
            )
            .await?,
        );

        let (block_tx, block_rx) = mpsc::channel(256);
        let tree = FanoutTree::build(
            identity,
            &registry.suitability_scores(now),
            config.turbine.fanout,
        );
        let turbine = Arc::new(
            TurbineService::bind(
                identity,
                &config.ip,
                config.tvu_port,
                config.turbine.clone(),
                Arc::clone(&address_book),
                tree,
                block_tx,
            )
            .await?,
        );

        let (shutdown, _) = tokio::sync::watch::channel(false);

        let mut node = Self {
            identity,
            keypair: Arc::new(keypair),
            config,
            address_book,
            registry,
            schedule,
            mempool,
            poh,
            pipeline: Arc::clone(&pipeline),
            forwarder,
            tpu,
            turbine,
            tasks: Vec::new(),
            shutdown,
        };

        // Reception consumer: one task per chain preserves append order.
        node.tasks.push(pipeline.spawn_consumer(block_rx));
        info!(
            identity = %hex::encode(&node.identity[..8]),
            network = %genesis.network_id,
            "node bootstrapped"
        );
        Ok(node)
    }

    /// Start the datagram listeners, the PoH clock, the bundle flusher,
    /// and the slot producer.
    pub fn start(&mut self) {
        self.poh.start();
        self.tasks.push(self.tpu.start());
        self.tasks.push(self.turbine.start());
        self.tasks.push(
            Arc::clone(&self.forwarder).spawn_flusher(self.shutdown.subscribe()),
        );

        let producer = SlotProducer::new(
            self.identity,
            Arc::clone(&self.keypair),
            Arc::clone(&self.schedule),
            Arc::clone(&self.mempool),
            Arc::clone(&self.poh),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.turbine),
            Arc::clone(&self.registry),
            self.config.turbine.fanout,
        );
        self.tasks.push(producer.spawn(self.shutdown.subscribe()));
        info!("node started");
    }

    /// Stop background work. Listener sockets close with their tasks.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        self.tpu.stop();
        self.turbine.stop();
        self.poh.stop();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("node stopped");
    }

    /// Local submission path: validate, pool, and forward toward the
    /// upcoming leaders. The same transaction arriving later over TPU
    /// deduplicates by id. Rejections carry a deterministic reason;
    /// forwarding gives no delivery guarantee.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<(), CoreError> {
        verify_transaction(&tx).map_err(submission_error)?;
        self.mempool.insert(tx.clone()).map_err(submission_error)?;
        self.forwarder.submit(tx).await;
        Ok(())
    }
}

fn submission_error(error: MempoolError) -> CoreError {
    match error {
        MempoolError::Duplicate(_) => CoreError::Conflict(error.to_string()),
        MempoolError::IdMismatch | MempoolError::BadSignature => {
            CoreError::Validation(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransactionType;

    fn ephemeral_config() -> NodeConfig {
        NodeConfig {
            tpu_port: 0,
            tvu_port: 0,
            ip: "127.0.0.1".to_string(),
            ..NodeConfig::default()
        }
    }

    fn signed_tx(signer: &P256KeyPair, amount: u64) -> Transaction {
        let mut tx = Transaction {
            sender: *signer.public_key().as_bytes(),
            receiver: [9u8; 33],
            amount,
            tx_type: TransactionType::Transfer,
            timestamp: unix_micros(),
            id: [0u8; 32],
            signature: [0u8; 64],
        };
        tx.id = tx.compute_id();
        tx.signature = *signer.sign(&tx.signing_bytes()).as_bytes();
        tx
    }

    fn devnet_genesis(node_key: &P256KeyPair, alice: &P256KeyPair) -> GenesisConfig {
        GenesisConfig {
            network_id: "test-devnet".to_string(),
            faucet_pubkey: hex::encode(node_key.public_key().as_bytes()),
            initial_supply: 100_000,
            initial_accounts: vec![shared_types::genesis::GenesisAccount {
                pubkey: hex::encode(alice.public_key().as_bytes()),
                balance: 1_000,
            }],
        }
    }

    #[tokio::test]
    async fn test_bootstrap_and_submit() {
        let node_key = P256KeyPair::from_bytes([3u8; 32]).unwrap();
        let alice = P256KeyPair::from_bytes([2u8; 32]).unwrap();
        let genesis = devnet_genesis(&node_key, &alice);

        let node = Node::bootstrap(ephemeral_config(), node_key, &genesis)
            .await
            .unwrap();
        assert!(node.schedule.next_ready());
        assert_eq!(node.pipeline.height(), 0);

        let tx = signed_tx(&alice, 50);
        node.submit_transaction(tx.clone()).await.unwrap();
        assert_eq!(node.mempool.len(), 1);

        // Resubmission is a deterministic conflict.
        assert!(matches!(
            node.submit_transaction(tx).await,
            Err(CoreError::Conflict(_))
        ));

        // Tampered transactions never reach the pool.
        let mut bad = signed_tx(&alice, 60);
        bad.amount = 61;
        assert!(matches!(
            node.submit_transaction(bad).await,
            Err(CoreError::Validation(_))
        ));
        assert_eq!(node.mempool.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_node_produces_blocks() {
        let node_key = P256KeyPair::from_bytes([3u8; 32]).unwrap();
        let alice = P256KeyPair::from_bytes([2u8; 32]).unwrap();
        let alice_key = *alice.public_key().as_bytes();
        let genesis = devnet_genesis(&node_key, &alice);

        let mut node = Node::bootstrap(ephemeral_config(), node_key, &genesis)
            .await
            .unwrap();
        node.start();
        node.submit_transaction(signed_tx(&alice, 300)).await.unwrap();

        // The sole registered node leads every slot (400 ms); a few
        // slots are ample.
        let mut produced = false;
        for _ in 0..150 {
            if node.pipeline.height() >= 1 && node.mempool.is_empty() {
                produced = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        node.stop().await;

        assert!(produced, "no block produced within the window");
        assert_eq!(node.pipeline.state().get_balance(&alice_key), 700);
        assert_eq!(node.pipeline.state().get_balance(&[9u8; 33]), 300);
        assert_eq!(node.pipeline.state().total_supply(), 100_000);
    }
}
