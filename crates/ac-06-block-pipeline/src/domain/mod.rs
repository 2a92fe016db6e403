//! Domain logic: chain store, block assembly, validation.

pub mod chain;
pub mod errors;
pub mod proposer;
pub mod validation;
