//! Replay guard for probe nonces.
//!
//! Every accepted `(source, nonce)` pair is recorded with an expiry;
//! a repeat inside the window is rejected. Expired pairs are swept
//! opportunistically on insert.

use parking_lot::Mutex;
use std::collections::HashMap;

use shared_types::PublicKey;

/// Sliding-window nonce registry.
#[derive(Debug, Default)]
pub struct NonceRegistry {
    seen: Mutex<HashMap<(PublicKey, u64), u64>>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a nonce. Returns `false` when the pair was already seen
    /// and has not yet expired.
    pub fn check_and_record(
        &self,
        source: &PublicKey,
        nonce: u64,
        now_us: u64,
        window_us: u64,
    ) -> bool {
        let mut seen = self.seen.lock();
        // Sweep expired entries so the map stays bounded by the window.
        seen.retain(|_, expiry| *expiry > now_us);

        match seen.get(&(*source, nonce)) {
            Some(_) => false,
            None => {
                seen.insert((*source, nonce), now_us + window_us);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
