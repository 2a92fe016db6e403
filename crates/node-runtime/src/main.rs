//! Minimal host entry point: a single-node devnet with a generated
//! identity acting as its own faucet. Real deployments embed the
//! runtime and supply genesis, keys, and peers themselves.

use node_runtime::{init_tracing, Node, NodeConfig};
use shared_crypto::P256KeyPair;
use shared_types::GenesisConfig;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(Level::INFO);

    let keypair = P256KeyPair::generate();
    let genesis = GenesisConfig {
        network_id: "annealing-devnet".to_string(),
        faucet_pubkey: hex::encode(keypair.public_key().as_bytes()),
        initial_supply: 1_000_000_000,
        initial_accounts: vec![],
    };

    let mut node = Node::bootstrap(NodeConfig::default(), keypair, &genesis).await?;
    node.start();
    info!("devnet node running; ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    node.stop().await;
    Ok(())
}
