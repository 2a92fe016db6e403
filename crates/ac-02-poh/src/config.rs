//! Sequencer configuration.

/// Tunables for the hash loop and entry retention.
#[derive(Debug, Clone)]
pub struct PohConfig {
    /// Target tick rate of the cryptographic clock.
    pub ticks_per_second: u32,
    /// Entries retained in memory before trimming.
    pub max_entries: usize,
    /// Fraction of the oldest entries dropped when the bound is hit,
    /// as a divisor (5 = drop the oldest 20%). Trimming is safe because
    /// verification is forward-chain only and sealed entries live in
    /// blocks.
    pub trim_divisor: usize,
}

impl Default for PohConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 5_000,
            max_entries: 10_000,
            trim_divisor: 5,
        }
    }
}

impl PohConfig {
    /// Interval between ticks at the target rate.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / self.ticks_per_second.max(1) as u64)
    }
}
