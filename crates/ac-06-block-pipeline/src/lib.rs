//! # Block Pipeline
//!
//! Block assembly on the leader's slot and validation on everyone
//! else's. A leader packs every available transaction, seals the order
//! with a PoH segment, executes in conflict-free parallel batches, and
//! signs the result. Receivers re-derive all of it: structure,
//! scheduled leader, signature, PoH continuity, and the state root via
//! re-execution on a snapshot.

pub mod config;
pub mod domain;
pub mod service;

pub use config::PipelineConfig;
pub use domain::chain::ChainState;
pub use domain::errors::BlockError;
pub use domain::proposer::{create_block, genesis_block};
pub use service::BlockPipeline;
