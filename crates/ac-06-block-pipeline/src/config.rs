//! Pipeline configuration.

/// Validation bounds.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Accepted distance between a block's timestamp and local wall
    /// clock.
    pub max_timestamp_skew_us: u64,
    /// Per-block verification budget; exceeding it fails the block.
    pub verify_budget_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_timestamp_skew_us: 10 * 1_000_000,
            verify_budget_us: 2 * 1_000_000,
        }
    }
}
