//! # Consensus Scorer & Quantum-Annealing Selector
//!
//! Live per-node suitability driven by cryptographically witnessed
//! probes, and a QUBO leader selector solved by deterministic simulated
//! annealing.
//!
//! ## Flow
//!
//! 1. Nodes probe each other; each round yields a [`ProbeProof`] signed
//!    by source, target, and a witness quorum.
//! 2. Verified proofs update the [`NodeRegistry`] metrics (uptime,
//!    latency EMA, throughput).
//! 3. Suitability scores feed a QUBO whose one-hot ground state is the
//!    selected representative; the annealer is seeded from a VRF output
//!    so every node reproduces the same selection.

pub mod config;
pub mod domain;
pub mod qubo;
pub mod selector;

pub use config::ConsensusConfig;
pub use domain::errors::ProbeError;
pub use domain::nonce::NonceRegistry;
pub use domain::probe::{probe_round, ProbeProof, ProbeRequest, TargetReceipt, WitnessReceipt};
pub use domain::registry::{NodeRecord, NodeRegistry};
pub use qubo::{Annealer, QuboProblem};
pub use selector::CandidateSelector;
