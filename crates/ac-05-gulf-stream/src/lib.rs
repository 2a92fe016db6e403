//! # Gulf Stream & TPU
//!
//! Moves transactions to upcoming leaders before their slots begin.
//! The forwarder bundles pending transactions per target and ships them
//! over connectionless datagrams to each target's TPU port; the TPU
//! listener runs on every node so a leader-elect's pool is already
//! populated when its slot arrives. Loss is tolerated: each transaction
//! goes to the current leader and the next three.

pub mod bundler;
pub mod config;
pub mod errors;
pub mod forwarder;
pub mod mempool;
pub mod tpu;
pub mod tx_verify;

pub use bundler::BundleQueue;
pub use config::GulfStreamConfig;
pub use errors::MempoolError;
pub use forwarder::{ForwarderStats, GulfStreamForwarder};
pub use mempool::Mempool;
pub use tpu::{TpuListener, TpuStats};
pub use tx_verify::verify_transaction;
