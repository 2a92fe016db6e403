//! Shared fixtures: deterministic keys, signed transactions, and a
//! two-account genesis.

use ac_01_accounts::ParallelExecutor;
use ac_06_block_pipeline::{genesis_block, BlockPipeline, PipelineConfig};
use shared_crypto::P256KeyPair;
use shared_types::genesis::GenesisAccount;
use shared_types::{GenesisConfig, PublicKey, Transaction, TransactionType};

/// Deterministic keypair from a single seed byte.
pub fn keypair(seed: u8) -> P256KeyPair {
    P256KeyPair::from_bytes([seed; 32]).expect("nonzero seed bytes form a valid scalar")
}

pub fn pubkey(keypair: &P256KeyPair) -> PublicKey {
    *keypair.public_key().as_bytes()
}

/// A fully signed transfer.
pub fn transfer(signer: &P256KeyPair, receiver: PublicKey, amount: u64, ts: u64) -> Transaction {
    let mut tx = Transaction {
        sender: pubkey(signer),
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

/// Genesis with the given pre-funded accounts and seed-1 faucet.
pub fn genesis_with(accounts: &[(PublicKey, u64)], supply: u64) -> GenesisConfig {
    GenesisConfig {
        network_id: "test-net".to_string(),
        faucet_pubkey: hex::encode(pubkey(&keypair(1))),
        initial_supply: supply,
        initial_accounts: accounts
            .iter()
            .map(|(key, balance)| GenesisAccount {
                pubkey: hex::encode(key),
                balance: *balance,
            })
            .collect(),
    }
}

/// A pipeline over a fresh chain started from `config`.
pub fn pipeline_from(config: &GenesisConfig) -> BlockPipeline {
    let (genesis, state) = genesis_block(config).expect("valid genesis");
    BlockPipeline::new(
        PipelineConfig::default(),
        genesis,
        state,
        config.faucet_key().expect("valid faucet key"),
        ParallelExecutor::new(4),
    )
}

