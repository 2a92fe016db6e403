//! # Shared Types
//!
//! Domain entities and the canonical wire codec shared across all
//! Annealing-Chain subsystems.
//!
//! ## Clusters
//!
//! - **Chain**: [`Transaction`], [`Block`], [`PohEntry`]
//! - **Propagation**: [`Shred`], [`ShredKind`], datagram payloads
//! - **Network**: [`ContactInfo`], [`AddressBook`]
//! - **Bootstrap**: [`GenesisConfig`]

pub mod address_book;
pub mod codec;
pub mod entities;
pub mod errors;
pub mod genesis;
pub mod time;

pub use address_book::AddressBook;
pub use codec::{decode, encode, CodecError};
pub use entities::{
    Block, BlockHeaderView, ContactInfo, ExecutionMetadata, Hash, PohEntry, PublicKey, Shred,
    ShredKind, Signature, Transaction, TransactionType, TpuBundle, ZERO_HASH,
};
pub use errors::CoreError;
pub use genesis::GenesisConfig;
