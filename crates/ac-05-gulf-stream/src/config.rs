//! Forwarding configuration.

/// Tunables for bundling and ingress.
#[derive(Debug, Clone)]
pub struct GulfStreamConfig {
    /// A pending bundle is flushed after this long even if not full.
    pub bundle_timeout_us: u64,
    /// Flush a bundle once its encoded payload reaches this size, so
    /// bundles fit a single datagram.
    pub max_bundle_bytes: usize,
    /// Receive buffer for the TPU socket.
    pub recv_buffer_bytes: usize,
    /// Local mempool capacity; the oldest entry is evicted at the cap.
    pub mempool_capacity: usize,
    /// Recently seen transaction ids kept for ingress deduplication.
    pub dedup_capacity: usize,
}

impl Default for GulfStreamConfig {
    fn default() -> Self {
        Self {
            bundle_timeout_us: 10_000,
            max_bundle_bytes: 1_200,
            recv_buffer_bytes: 65_536,
            mempool_capacity: 10_000,
            dedup_capacity: 65_536,
        }
    }
}
