//! # Verifiable Scheduling Seeds
//!
//! A lightweight VRF built from the primitives already in use: the signer
//! produces an RFC 6979 deterministic P-256 signature over the input
//! (typically the previous block id) and the output is the SHA-256 of
//! that signature. Determinism makes the output reproducible; the
//! signature makes it checkable by anyone holding the public key.
//!
//! Unpredictable-before-publication, not bias-resistant in the
//! information-theoretic sense; that is sufficient for seeding the leader
//! schedule, which only needs capture resistance.

use crate::ecdsa::{P256KeyPair, P256PublicKey, P256Signature};
use crate::hashing::{sha256_hash, Hash};
use crate::CryptoError;

/// Evaluate the VRF: returns `(output, proof)` where `proof` is the
/// deterministic signature over `input`.
pub fn evaluate_vrf(keypair: &P256KeyPair, input: &[u8]) -> (Hash, P256Signature) {
    let proof = keypair.sign(input);
    (sha256_hash(proof.as_bytes()), proof)
}

/// Verify a VRF proof and recompute the output.
pub fn verify_vrf(
    pubkey: &P256PublicKey,
    input: &[u8],
    proof: &P256Signature,
) -> Result<Hash, CryptoError> {
    pubkey.verify(input, proof)?;
    Ok(sha256_hash(proof.as_bytes()))
}

/// First 8 bytes of a VRF output as a little-endian seed for the
/// annealing RNG.
pub fn seed_from_output(output: &Hash) -> u64 {
    u64::from_le_bytes(output[..8].try_into().expect("hash has at least 8 bytes"))
}
