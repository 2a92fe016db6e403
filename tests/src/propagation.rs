//! Propagation and wire-form scenarios: blocks crossing real sockets
//! as shreds, and byte-identical codec round-trips.

use std::sync::Arc;
use tokio::sync::mpsc;

use ac_02_poh::{PohConfig, PohSequencer};
use ac_03_consensus::{CandidateSelector, ConsensusConfig, NodeRegistry};
use ac_04_leader_schedule::{LeaderSchedule, ScheduleConfig};
use ac_05_gulf_stream::{GulfStreamConfig, GulfStreamForwarder, Mempool, TpuListener};
use ac_07_turbine::{FanoutTree, TurbineConfig, TurbineService};
use shared_types::time::unix_micros;
use shared_types::{codec, AddressBook, Block, ContactInfo, PublicKey, Transaction};

use crate::helpers::*;

fn contact(pubkey: PublicKey, tvu_port: u16) -> ContactInfo {
    ContactInfo {
        pubkey,
        ip: "127.0.0.1".to_string(),
        gossip_port: 0,
        tpu_port: 0,
        tvu_port,
        wallclock: unix_micros(),
    }
}

#[test]
fn test_transaction_wire_roundtrip_is_byte_identical() {
    let alice = keypair(2);
    let tx = transfer(&alice, [9u8; 33], 12_345, 777);
    let bytes = codec::encode(&tx).unwrap();
    let decoded: Transaction = codec::decode(&bytes).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(codec::encode(&decoded).unwrap(), bytes);
}

#[test]
fn test_block_wire_roundtrip_is_byte_identical() {
    let alice = keypair(2);
    let leader = keypair(4);
    let genesis = genesis_with(&[(pubkey(&alice), 1_000)], 10_000);
    let pipeline = pipeline_from(&genesis);
    let poh = PohSequencer::new(PohConfig::default(), pipeline.head().id);

    let block = pipeline.propose(
        &leader,
        vec![transfer(&alice, [9u8; 33], 5, 1)],
        &poh,
        unix_micros(),
    );

    let bytes = codec::encode(&block).unwrap();
    let decoded: Block = codec::decode(&bytes).unwrap();
    assert_eq!(decoded, block);
    assert_eq!(decoded.id(), block.id());
    assert_eq!(codec::encode(&decoded).unwrap(), bytes);
}

/// A transaction submitted anywhere lands in the leader-elect's pool
/// ahead of its slot and ends up inside the leader's next block.
#[tokio::test(flavor = "multi_thread")]
async fn test_gulf_stream_feeds_leader_block() {
    let alice = keypair(2);
    let leader = keypair(4);
    let leader_key = pubkey(&leader);
    let now = unix_micros();

    // Single-node consensus: the leader holds every slot.
    let registry = Arc::new(NodeRegistry::new(ConsensusConfig::default()));
    registry.register(leader_key, now);
    let selector = Arc::new(CandidateSelector::new(registry));
    let schedule = Arc::new(
        LeaderSchedule::bootstrap(ScheduleConfig::default(), selector, [1u8; 32], now).unwrap(),
    );

    // Leader's TPU listener and pool.
    let leader_pool = Arc::new(Mempool::with_defaults());
    let tpu = TpuListener::bind(
        "127.0.0.1",
        0,
        GulfStreamConfig::default(),
        Arc::clone(&leader_pool),
    )
    .await
    .unwrap();
    let tpu_task = tpu.start();

    let book = Arc::new(AddressBook::new());
    book.upsert(ContactInfo {
        pubkey: leader_key,
        ip: "127.0.0.1".to_string(),
        gossip_port: 0,
        tpu_port: tpu.local_addr().unwrap().port(),
        tvu_port: 0,
        wallclock: now,
    });

    // A different node forwards a freshly submitted transaction.
    let forwarder = GulfStreamForwarder::bind(
        [9u8; 33],
        GulfStreamConfig {
            bundle_timeout_us: 0,
            ..GulfStreamConfig::default()
        },
        schedule,
        book,
    )
    .await
    .unwrap();

    let tx = transfer(&alice, [7u8; 33], 40, 1);
    forwarder.submit(tx.clone()).await;
    forwarder.flush_due().await;

    for _ in 0..400 {
        if !leader_pool.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(leader_pool.contains(&tx.id));

    // Slot arrives: the leader packs its pre-populated pool.
    let genesis = genesis_with(&[(pubkey(&alice), 1_000)], 10_000);
    let pipeline = pipeline_from(&genesis);
    let poh = PohSequencer::new(PohConfig::default(), pipeline.head().id);
    let block = pipeline.propose(&leader, leader_pool.drain_all(), &poh, unix_micros());
    assert_eq!(block.transactions.len(), 1);
    assert_eq!(block.transactions[0].id, tx.id);
    assert!(pipeline
        .process_block(block, unix_micros())
        .unwrap());

    tpu.stop();
    let _ = tpu_task.await;
}

/// A leader's block crosses the wire as shreds and commits on an
/// independent validator: same height, same state root, same balances.
#[tokio::test(flavor = "multi_thread")]
async fn test_block_propagates_between_nodes() {
    let alice = keypair(2);
    let bob_key: PublicKey = [9u8; 33];
    let leader = keypair(4);
    let leader_key = pubkey(&leader);
    let validator_key: PublicKey = [8u8; 33];

    let genesis = genesis_with(&[(pubkey(&alice), 1_000)], 10_000);

    // Leader side.
    let leader_pipeline = Arc::new(pipeline_from(&genesis));
    // Validator side: independent chain, same genesis.
    let validator_pipeline = Arc::new(pipeline_from(&genesis));

    let book = Arc::new(AddressBook::new());
    let tree = FanoutTree::build(leader_key, &[(validator_key, 0.5)], 4);

    let (leader_tx, _leader_rx) = mpsc::channel(8);
    let leader_turbine = Arc::new(
        TurbineService::bind(
            leader_key,
            "127.0.0.1",
            0,
            TurbineConfig::default(),
            Arc::clone(&book),
            tree.clone(),
            leader_tx,
        )
        .await
        .unwrap(),
    );

    let (validator_tx, validator_rx) = mpsc::channel(8);
    let validator_turbine = Arc::new(
        TurbineService::bind(
            validator_key,
            "127.0.0.1",
            0,
            TurbineConfig::default(),
            Arc::clone(&book),
            tree,
            validator_tx,
        )
        .await
        .unwrap(),
    );
    book.upsert(contact(
        validator_key,
        validator_turbine.local_addr().unwrap().port(),
    ));

    validator_turbine.start();
    let consumer = Arc::clone(&validator_pipeline).spawn_consumer(validator_rx);

    // Leader produces and broadcasts.
    let poh = PohSequencer::new(PohConfig::default(), leader_pipeline.head().id);
    let now = unix_micros();
    let block = leader_pipeline.propose(
        &leader,
        vec![transfer(&alice, bob_key, 300, 1)],
        &poh,
        now,
    );
    leader_pipeline.process_block(block.clone(), now).unwrap();
    leader_turbine.broadcast_block(&block).await.unwrap();

    // Validator reconstructs, validates, and commits.
    for _ in 0..400 {
        if validator_pipeline.height() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(validator_pipeline.height(), 1);
    assert_eq!(validator_pipeline.head().id, block.id());
    assert_eq!(
        validator_pipeline.state().state_root(),
        leader_pipeline.state().state_root()
    );
    assert_eq!(validator_pipeline.state().get_balance(&bob_key), 300);
    assert_eq!(validator_turbine.stats().blocks_reconstructed, 1);

    validator_turbine.stop();
    consumer.abort();
}

/// A large block (thousands of transactions) still shreds, crosses the
/// socket, reconstructs, and validates.
#[tokio::test(flavor = "multi_thread")]
async fn test_large_block_propagates() {
    let leader = keypair(4);
    let leader_key = pubkey(&leader);
    let validator_key: PublicKey = [8u8; 33];

    // One funded sender per transaction keeps the batch conflict-free.
    let senders: Vec<_> = (10..210u8).map(keypair).collect();
    let funded: Vec<(PublicKey, u64)> =
        senders.iter().map(|kp| (pubkey(kp), 1_000)).collect();
    let genesis = genesis_with(&funded, 1_000_000);

    let leader_pipeline = Arc::new(pipeline_from(&genesis));
    let validator_pipeline = Arc::new(pipeline_from(&genesis));

    let book = Arc::new(AddressBook::new());
    let tree = FanoutTree::build(leader_key, &[(validator_key, 0.5)], 4);
    let (leader_tx, _keep) = mpsc::channel(8);
    let leader_turbine = Arc::new(
        TurbineService::bind(
            leader_key,
            "127.0.0.1",
            0,
            TurbineConfig::default(),
            Arc::clone(&book),
            tree.clone(),
            leader_tx,
        )
        .await
        .unwrap(),
    );
    let (validator_tx, validator_rx) = mpsc::channel(8);
    let validator_turbine = Arc::new(
        TurbineService::bind(
            validator_key,
            "127.0.0.1",
            0,
            TurbineConfig::default(),
            Arc::clone(&book),
            tree,
            validator_tx,
        )
        .await
        .unwrap(),
    );
    book.upsert(contact(
        validator_key,
        validator_turbine.local_addr().unwrap().port(),
    ));
    validator_turbine.start();
    let consumer = Arc::clone(&validator_pipeline).spawn_consumer(validator_rx);

    let txs: Vec<Transaction> = senders
        .iter()
        .enumerate()
        .map(|(i, kp)| transfer(kp, [7u8; 33], 1 + i as u64, i as u64))
        .collect();

    let poh = PohSequencer::new(PohConfig::default(), leader_pipeline.head().id);
    let now = unix_micros();
    let block = leader_pipeline.propose(&leader, txs, &poh, now);
    assert_eq!(block.transactions.len(), 200);
    leader_pipeline.process_block(block.clone(), now).unwrap();
    leader_turbine.broadcast_block(&block).await.unwrap();

    for _ in 0..600 {
        if validator_pipeline.height() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(validator_pipeline.height(), 1);
    assert_eq!(
        validator_pipeline.state().state_root(),
        leader_pipeline.state().state_root()
    );

    validator_turbine.stop();
    consumer.abort();
}
