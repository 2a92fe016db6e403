//! Propagation configuration.

/// Shredding and fanout tunables. Parity policy (erasure-set size and
/// overhead) is a protocol constant in the shred codec, not
/// configuration, so encoders and decoders can never disagree.
#[derive(Debug, Clone)]
pub struct TurbineConfig {
    /// Payload bytes per data shred.
    pub data_shred_bytes: usize,
    /// Children per node in the fanout tree.
    pub fanout: usize,
    /// Blocks held in the reconstruction buffer; oldest evicted first.
    pub max_buffered_blocks: usize,
    /// Receive buffer for the TVU socket.
    pub recv_buffer_bytes: usize,
}

impl Default for TurbineConfig {
    fn default() -> Self {
        Self {
            data_shred_bytes: 1_024,
            fanout: 4,
            max_buffered_blocks: 64,
            recv_buffer_bytes: 65_536,
        }
    }
}
