//! # Annealing-Chain Node Runtime
//!
//! The host arena: owns every subsystem of one node and wires them
//! together with handles and bounded channels. No subsystem owns the
//! graph; each receives exactly the peers it needs.
//!
//! ## Subsystems
//!
//! 1. Account state & parallel executor
//! 2. PoH sequencer
//! 3. Consensus registry & annealing selector
//! 4. Leader schedule
//! 5. Gulf Stream forwarder & TPU listener
//! 6. Block pipeline
//! 7. Turbine propagation

pub mod config;
pub mod node;
pub mod slot_producer;

pub use config::NodeConfig;
pub use node::Node;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber. Host-process concern; the
/// core crates only emit events.
pub fn init_tracing(level: Level) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
