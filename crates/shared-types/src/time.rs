//! Wall-clock helpers. Timestamps are Unix microseconds throughout.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in microseconds.
pub fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Microseconds to whole seconds, rounding down.
pub fn micros_to_secs(micros: u64) -> u64 {
    micros / 1_000_000
}
