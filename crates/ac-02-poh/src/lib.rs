//! # Proof-of-History Sequencer
//!
//! A continuous SHA-256 hash chain acting as a cryptographic clock.
//! Empty ticks advance the chain; ingested transaction ids are mixed
//! into the next tick, which fixes a verifiable global order on every
//! transaction in a block.

pub mod config;
pub mod sequencer;
pub mod verify;

pub use config::PohConfig;
pub use sequencer::{PohSequencer, PohStats};
pub use verify::{verify_anchored, verify_continuity};
