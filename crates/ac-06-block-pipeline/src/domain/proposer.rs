//! Block assembly on the leader's slot.

use tracing::{debug, info};

use ac_01_accounts::{AccountState, ParallelExecutor, Snapshot};
use ac_02_poh::PohSequencer;
use ac_05_gulf_stream::verify_transaction;
use shared_crypto::P256KeyPair;
use shared_types::{
    Block, ExecutionMetadata, GenesisConfig, Hash, PublicKey, Transaction, TransactionType,
    ZERO_HASH,
};

/// Build the deterministic genesis block and its account state from a
/// genesis configuration. Unsigned and timestamped at zero so every
/// node derives the identical block id.
pub fn genesis_block(
    config: &GenesisConfig,
) -> Result<(Block, AccountState), shared_types::genesis::GenesisError> {
    let faucet = config.faucet_key()?;
    let mut funded = config.funded_accounts()?;
    let allocated: u64 = funded.iter().map(|(_, balance)| balance).sum();
    // The remainder of the supply stays with the faucet for bootstrap
    // Exchange mints.
    funded.push((faucet, config.initial_supply.saturating_sub(allocated)));

    let state = AccountState::with_genesis(funded);
    let block = Block {
        height: 0,
        prev_hash: ZERO_HASH,
        proposer: faucet,
        timestamp: 0,
        transactions: vec![],
        poh: vec![],
        state_root: state.state_root(),
        execution: ExecutionMetadata::default(),
        signature: [0u8; 64],
    };
    info!(
        network = %config.network_id,
        supply = config.initial_supply,
        "genesis block built"
    );
    Ok((block, state))
}

/// Drop duplicates by id, preserving first arrival; drop transactions
/// whose signatures fail or that claim the faucet without its key.
pub fn admit_transactions(
    candidates: Vec<Transaction>,
    faucet: &PublicKey,
) -> Vec<Transaction> {
    let mut seen: Vec<Hash> = Vec::new();
    let mut admitted = Vec::new();
    for tx in candidates {
        if seen.contains(&tx.id) {
            continue;
        }
        if verify_transaction(&tx).is_err() {
            debug!(tx = %tx.short_id(), "dropped transaction with bad signature");
            continue;
        }
        if tx.tx_type == TransactionType::Exchange && tx.sender != *faucet {
            debug!(tx = %tx.short_id(), "dropped exchange from non-faucet key");
            continue;
        }
        seen.push(tx.id);
        admitted.push(tx);
    }
    admitted
}

/// Assemble, execute, and sign a block on top of `parent`.
///
/// Everything available is packed: the caller hands the union of the
/// local pool and the TPU pool, and no size cap is applied. Execution
/// runs on a detached copy of the parent state; the live state is only
/// touched when the block commits through the reception path.
#[allow(clippy::too_many_arguments)]
pub fn create_block(
    keypair: &P256KeyPair,
    parent: &Block,
    poh_anchor: Hash,
    candidates: Vec<Transaction>,
    poh: &PohSequencer,
    executor: &ParallelExecutor,
    parent_state: Snapshot,
    faucet: &PublicKey,
    now_us: u64,
) -> Block {
    let transactions = admit_transactions(candidates, faucet);
    let tx_ids: Vec<Hash> = transactions.iter().map(|tx| tx.id).collect();

    // The PoH segment both orders the transactions and seals their
    // arrival time.
    let segment = poh.seal_segment(poh_anchor, &tx_ids);

    let state = AccountState::from_snapshot(parent_state);
    let result = executor.execute_batch(&state, &transactions);
    let applied_count = result.applied_count();

    let mut block = Block {
        height: parent.height + 1,
        prev_hash: parent.id(),
        proposer: *keypair.public_key().as_bytes(),
        timestamp: now_us,
        transactions,
        poh: segment,
        state_root: state.state_root(),
        execution: result.metadata,
        signature: [0u8; 64],
    };
    block.signature = *keypair.sign(&block.canonical_payload()).as_bytes();

    info!(
        height = block.height,
        transactions = block.transactions.len(),
        applied = applied_count,
        "block assembled"
    );
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_02_poh::{verify_anchored, PohConfig};

    fn keypair(byte: u8) -> P256KeyPair {
        P256KeyPair::from_bytes([byte; 32]).unwrap()
    }

    fn signed_tx(signer: &P256KeyPair, receiver: PublicKey, amount: u64, ts: u64) -> Transaction {
        let mut tx = Transaction {
            sender: *signer.public_key().as_bytes(),
            receiver,
            amount,
            tx_type: TransactionType::Transfer,
            timestamp: ts,
            id: [0u8; 32],
            signature: [0u8; 64],
        };
        tx.id = tx.compute_id();
        tx.signature = *signer.sign(&tx.signing_bytes()).as_bytes();
        tx
    }

    fn genesis_config(faucet: &P256KeyPair, funded: &[(PublicKey, u64)]) -> GenesisConfig {
        GenesisConfig {
            network_id: "test".to_string(),
            faucet_pubkey: hex::encode(faucet.public_key().as_bytes()),
            initial_supply: 1_000_000,
            initial_accounts: funded
                .iter()
                .map(|(k, v)| shared_types::genesis::GenesisAccount {
                    pubkey: hex::encode(k),
                    balance: *v,
                })
                .collect(),
        }
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let faucet = keypair(1);
        let config = genesis_config(&faucet, &[([9u8; 33], 1000)]);
        let (a, _) = genesis_block(&config).unwrap();
        let (b, _) = genesis_block(&config).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.height, 0);
        assert!(a.poh.is_empty());
    }

    #[test]
    fn test_genesis_supply_allocated() {
        let faucet = keypair(1);
        let config = genesis_config(&faucet, &[([9u8; 33], 1000)]);
        let (_, state) = genesis_block(&config).unwrap();
        assert_eq!(state.total_supply(), 1_000_000);
        assert_eq!(state.get_balance(&[9u8; 33]), 1000);
    }

    #[test]
    fn test_admit_dedups_and_filters() {
        let alice = keypair(2);
        let faucet_key = *keypair(1).public_key().as_bytes();
        let tx = signed_tx(&alice, [9u8; 33], 10, 1);
        let mut forged = signed_tx(&alice, [9u8; 33], 20, 2);
        forged.amount = 9_999;

        let admitted = admit_transactions(vec![tx.clone(), tx.clone(), forged], &faucet_key);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].amount, 10);
    }

    #[test]
    fn test_admit_rejects_fake_faucet() {
        let alice = keypair(2);
        let faucet_key = *keypair(1).public_key().as_bytes();
        let mut minty = signed_tx(&alice, [9u8; 33], 10, 1);
        minty.tx_type = TransactionType::Exchange;
        minty.id = minty.compute_id();
        minty.signature = *alice.sign(&minty.signing_bytes()).as_bytes();

        assert!(admit_transactions(vec![minty], &faucet_key).is_empty());
    }

    #[test]
    fn test_created_block_is_internally_consistent() {
        let faucet = keypair(1);
        let leader = keypair(3);
        let alice = keypair(2);
        let alice_key = *alice.public_key().as_bytes();

        let config = genesis_config(&faucet, &[(alice_key, 1000)]);
        let (parent, state) = genesis_block(&config).unwrap();
        let poh = PohSequencer::new(PohConfig::default(), parent.id());
        let executor = ParallelExecutor::new(4);

        let tx = signed_tx(&alice, [9u8; 33], 300, 5);
        let block = create_block(
            &leader,
            &parent,
            parent.id(),
            vec![tx],
            &poh,
            &executor,
            state.snapshot(),
            faucet.public_key().as_bytes(),
            1_000_000,
        );

        assert_eq!(block.height, 1);
        assert_eq!(block.prev_hash, parent.id());
        assert_eq!(block.transactions.len(), 1);
        assert!(verify_anchored(&parent.id(), &block.poh));
        // Segment mixes exactly the packed transaction.
        let poh_ids: Vec<Hash> = block.poh.iter().filter_map(|e| e.tx_id).collect();
        assert_eq!(poh_ids, vec![block.transactions[0].id]);
        // Signature covers the payload.
        assert!(shared_crypto::ecdsa::verify_raw(
            &block.proposer,
            &block.canonical_payload(),
            &block.signature
        ));
    }

    #[test]
    fn test_empty_block_has_tick_only_segment() {
        let faucet = keypair(1);
        let leader = keypair(3);
        let config = genesis_config(&faucet, &[]);
        let (parent, state) = genesis_block(&config).unwrap();
        let poh = PohSequencer::new(PohConfig::default(), parent.id());
        let executor = ParallelExecutor::new(4);

        let block = create_block(
            &leader,
            &parent,
            parent.id(),
            vec![],
            &poh,
            &executor,
            state.snapshot(),
            faucet.public_key().as_bytes(),
            1_000_000,
        );
        assert!(block.transactions.is_empty());
        assert_eq!(block.poh.len(), 1);
        assert_eq!(block.poh[0].tx_id, None);
        assert_eq!(block.state_root, parent.state_root);
    }
}
