//! # Address Book
//!
//! Shared view of how to reach known peers. The peer-exchange protocol
//! (external to the core) feeds it; the forwarder and Turbine read it.
//!
//! Concurrency: shared readers, single writer per entry. An upsert only
//! replaces an entry when the incoming wallclock is newer.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::entities::{ContactInfo, PublicKey};

/// Entries older than this are evicted (1 hour, in microseconds).
pub const DEFAULT_STALE_AFTER_US: u64 = 3_600 * 1_000_000;

/// Thread-safe pubkey → contact map.
#[derive(Debug, Default)]
pub struct AddressBook {
    peers: RwLock<HashMap<PublicKey, ContactInfo>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a contact. Stale updates (older wallclock than
    /// the stored entry) are ignored.
    pub fn upsert(&self, contact: ContactInfo) {
        let mut peers = self.peers.write();
        match peers.get(&contact.pubkey) {
            Some(existing) if existing.wallclock >= contact.wallclock => {
                debug!(
                    pubkey = %hex::encode(&contact.pubkey[..4]),
                    "ignoring stale contact update"
                );
            }
            _ => {
                peers.insert(contact.pubkey, contact);
            }
        }
    }

    pub fn lookup(&self, pubkey: &PublicKey) -> Option<ContactInfo> {
        self.peers.read().get(pubkey).cloned()
    }

    /// Snapshot of all peers seen within the staleness horizon.
    pub fn active_peers(&self, now_us: u64) -> Vec<ContactInfo> {
        self.peers
            .read()
            .values()
            .filter(|c| now_us.saturating_sub(c.wallclock) < DEFAULT_STALE_AFTER_US)
            .cloned()
            .collect()
    }

    /// Drop entries not refreshed within `max_age_us`. Returns how many
    /// were removed.
    pub fn evict_stale(&self, now_us: u64, max_age_us: u64) -> usize {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|_, c| now_us.saturating_sub(c.wallclock) < max_age_us);
        before - peers.len()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
