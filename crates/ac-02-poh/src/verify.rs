//! Forward-chain verification.
//!
//! `entry.hash = SHA-256(prev_hash)` for empty ticks and
//! `SHA-256(prev_hash || tx_id)` for transaction entries. Validators
//! recompute the chain; any deviation rejects the sequence.

use shared_crypto::sha256_hash_many;
use shared_types::{Hash, PohEntry};

fn expected_hash(prev: &Hash, tx_id: &Option<Hash>) -> Hash {
    match tx_id {
        Some(id) => sha256_hash_many(&[prev, id]),
        None => sha256_hash_many(&[prev]),
    }
}

/// Verify internal continuity: every entry after the first chains from
/// its predecessor. Sequences of length 0 or 1 are trivially continuous.
pub fn verify_continuity(entries: &[PohEntry]) -> bool {
    entries.windows(2).all(|pair| {
        pair[1].hash == expected_hash(&pair[0].hash, &pair[1].tx_id)
            && pair[1].tick == pair[0].tick + 1
    })
}

/// Verify a segment against its anchor (the parent block's last PoH
/// hash) and internally. Empty segments fail: a block always advances
/// the clock.
pub fn verify_anchored(anchor: &Hash, entries: &[PohEntry]) -> bool {
    let Some(first) = entries.first() else {
        return false;
    };
    if first.hash != expected_hash(anchor, &first.tx_id) {
        return false;
    }
    verify_continuity(entries)
}
