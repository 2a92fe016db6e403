//! # Account State & Parallel Executor
//!
//! Thread-safe account records plus a conflict-graph scheduler that
//! executes non-overlapping transactions concurrently and commits
//! batches in input order.

pub mod domain;

pub use domain::conflicts::schedule_batches;
pub use domain::entities::{Account, Snapshot, TxOutcome, TxResult};
pub use domain::errors::AccountError;
pub use domain::executor::{BatchResult, ParallelExecutor, DEFAULT_WORKERS};
pub use domain::state::AccountState;
