//! # Turbine - Shredded Block Propagation
//!
//! A block is sliced into fixed-size data shreds plus Reed-Solomon
//! parity shreds and distributed over a deterministic, score-weighted
//! fanout tree: the leader transmits each shred once to its children,
//! every node retransmits to its own children, and any sufficient
//! subset of shreds reconstructs the block.

pub mod buffer;
pub mod config;
pub mod errors;
pub mod service;
pub mod shred;
pub mod tree;

pub use buffer::ReconstructionBuffer;
pub use config::TurbineConfig;
pub use errors::TurbineError;
pub use service::{TurbineService, TvuStats};
pub use shred::{reconstruct_block_bytes, shred_block_bytes};
pub use tree::FanoutTree;
