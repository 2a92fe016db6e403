//! Consensus configuration with documented defaults.

/// Tunables for the probe protocol, scorer, and annealing selector.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Minimum witness receipts a probe proof must carry.
    pub witness_quorum: usize,
    /// Sliding window during which a probe nonce may not repeat.
    pub nonce_window_us: u64,
    /// Maximum tolerated skew between the timestamps inside one probe
    /// round.
    pub max_skew_us: u64,
    /// Total time budget for a probe round; older proofs are discarded.
    pub probe_budget_us: u64,
    /// Rolling window for uptime and throughput metrics.
    pub metrics_window_us: u64,
    /// Smoothing factor for the latency EMA.
    pub latency_alpha: f64,
    /// Suitability weights: uptime, proposal success rate, throughput,
    /// latency (subtracted).
    pub weight_uptime: f64,
    pub weight_proposals: f64,
    pub weight_throughput: f64,
    pub weight_latency: f64,
    /// Cached suitability scores live this long.
    pub score_cache_ttl_us: u64,
    /// Share of the effective score drawn from VRF-seeded noise.
    pub randomness_weight: f64,
    /// Nodes silent for longer are no longer "active".
    pub active_threshold_us: u64,
    /// Nodes silent for longer are evicted from the registry.
    pub evict_after_us: u64,
    /// Probe records retained per node.
    pub max_probe_history: usize,
    /// Shortlist cap for the QUBO problem.
    pub max_candidates: usize,
    /// Annealing schedule length, in the solver's microsecond sweeps.
    pub annealing_time_us: u64,
    /// Start and end temperatures of the exponential schedule.
    pub temp_initial: f64,
    pub temp_final: f64,
    /// Extra pairwise penalty applied to same-cluster candidate pairs,
    /// as a fraction of the one-hot penalty.
    pub cluster_diversity_factor: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            witness_quorum: 2,
            nonce_window_us: 300 * 1_000_000,
            max_skew_us: 5 * 1_000_000,
            probe_budget_us: 2 * 1_000_000,
            metrics_window_us: 60 * 1_000_000,
            latency_alpha: 0.2,
            weight_uptime: 0.3,
            weight_proposals: 0.25,
            weight_throughput: 0.25,
            weight_latency: 0.2,
            score_cache_ttl_us: 60 * 1_000_000,
            randomness_weight: 0.15,
            active_threshold_us: 300 * 1_000_000,
            evict_after_us: 3_600 * 1_000_000,
            max_probe_history: 1_000,
            max_candidates: 50,
            annealing_time_us: 50,
            temp_initial: 10.0,
            temp_final: 0.1,
            cluster_diversity_factor: 0.1,
        }
    }
}

impl ConsensusConfig {
    /// Independent annealing restarts, scaled with candidate count.
    pub fn num_reads(&self, candidates: usize) -> usize {
        match candidates {
            0..=50 => 50,
            51..=200 => 75,
            201..=500 => 100,
            501..=1000 => 125,
            _ => 150,
        }
    }

    /// Shortlist size for a network of `node_count` nodes. Small
    /// networks use everyone; very large networks cap logarithmically.
    pub fn candidate_limit(&self, node_count: usize) -> usize {
        if node_count <= self.max_candidates {
            node_count
        } else {
            let scaled =
                (self.max_candidates as f64 * (node_count as f64 / 10.0).log10()) as usize;
            scaled.clamp(1, self.max_candidates)
        }
    }
}
