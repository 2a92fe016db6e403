//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Ids, PoH chain, state roots |
//! | `ecdsa` | NIST P-256 | Transaction/block/probe signing |
//! | `vrf` | P-256 + SHA-256 | Verifiable scheduling seeds |
//!
//! ## Security Properties
//!
//! - **P-256 ECDSA**: RFC 6979 deterministic nonces, no RNG dependency
//!   for signing
//! - **VRF construction**: a deterministic signature hashed to 32 bytes;
//!   anyone holding the signer's public key can re-derive and check the
//!   output

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod vrf;

// Re-exports
pub use ecdsa::{P256KeyPair, P256PublicKey, P256Signature};
pub use errors::CryptoError;
pub use hashing::{sha256_hash, sha256_hash_many, Sha256Hasher};
pub use vrf::{evaluate_vrf, verify_vrf};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
