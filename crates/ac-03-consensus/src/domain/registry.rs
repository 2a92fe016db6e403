//! Node registry and suitability scoring.
//!
//! Records are created on first registration and only ever updated from
//! verified probe proofs and block-proposal outcomes. Suitability is a
//! weighted sum of min-max normalized metrics across the active set,
//! cached with a TTL so scoring stays cheap at scale.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

use shared_crypto::sha256_hash_many;
use shared_types::{Hash, PublicKey};

use crate::config::ConsensusConfig;
use crate::domain::errors::ProbeError;
use crate::domain::nonce::NonceRegistry;
use crate::domain::probe::ProbeProof;

/// Live metrics for one node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub pubkey: PublicKey,
    /// Observed liveness fraction in [0, 1].
    pub uptime: f64,
    /// Round-trip latency EMA, seconds.
    pub latency: f64,
    /// Successfully proposed transactions per second over the window.
    pub throughput: f64,
    pub proposal_success: u64,
    pub proposal_failure: u64,
    pub last_seen_us: u64,
    /// Accumulated proposal reliability in [0, 1].
    pub trust_score: f64,
    /// Geographic/performance cluster, when known. Feeds the QUBO
    /// diversity terms.
    pub cluster_id: Option<u32>,
    probe_times: VecDeque<u64>,
    proposal_windows: VecDeque<(u64, u64)>,
}

impl NodeRecord {
    fn new(pubkey: PublicKey, now_us: u64) -> Self {
        Self {
            pubkey,
            uptime: 0.0,
            latency: 1.0,
            throughput: 0.0,
            proposal_success: 0,
            proposal_failure: 0,
            last_seen_us: now_us,
            trust_score: 0.5,
            cluster_id: None,
            probe_times: VecDeque::new(),
            proposal_windows: VecDeque::new(),
        }
    }

    /// Success fraction of proposals, zero before the first proposal.
    pub fn proposal_success_rate(&self) -> f64 {
        let total = self.proposal_success + self.proposal_failure;
        if total == 0 {
            0.0
        } else {
            self.proposal_success as f64 / total as f64
        }
    }

    fn refresh_throughput(&mut self, now_us: u64, window_us: u64) {
        while let Some(&(t, _)) = self.proposal_windows.front() {
            if now_us.saturating_sub(t) > window_us {
                self.proposal_windows.pop_front();
            } else {
                break;
            }
        }
        let total_tx: u64 = self.proposal_windows.iter().map(|&(_, n)| n).sum();
        let window_secs = window_us as f64 / 1_000_000.0;
        self.throughput = total_tx as f64 / window_secs.max(1e-9);
    }
}

/// All known nodes plus the replay guard and the score cache.
pub struct NodeRegistry {
    config: ConsensusConfig,
    nodes: RwLock<HashMap<PublicKey, NodeRecord>>,
    nonces: NonceRegistry,
    score_cache: Mutex<HashMap<PublicKey, (f64, u64)>>,
}

impl NodeRegistry {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            nodes: RwLock::new(HashMap::new()),
            nonces: NonceRegistry::new(),
            score_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Create a record on first sight, refresh `last_seen` otherwise.
    pub fn register(&self, pubkey: PublicKey, now_us: u64) {
        let mut nodes = self.nodes.write();
        nodes
            .entry(pubkey)
            .and_modify(|r| r.last_seen_us = now_us)
            .or_insert_with(|| {
                debug!(pubkey = %hex::encode(&pubkey[..4]), "registered node");
                NodeRecord::new(pubkey, now_us)
            });
    }

    /// Assign a cluster id, for diversity-aware selection.
    pub fn set_cluster(&self, pubkey: &PublicKey, cluster_id: u32) {
        if let Some(record) = self.nodes.write().get_mut(pubkey) {
            record.cluster_id = Some(cluster_id);
        }
    }

    /// Verify a probe proof and fold it into the target's metrics.
    /// Rejected proofs change nothing.
    pub fn apply_proof(&self, proof: &ProbeProof, now_us: u64) -> Result<(), ProbeError> {
        proof.verify(&self.config, &self.nonces, now_us)?;

        self.register(proof.request.source, now_us);
        self.register(proof.request.target, now_us);
        for witness in &proof.witnesses {
            self.register(witness.witness, now_us);
        }

        let mut nodes = self.nodes.write();
        let record = nodes
            .get_mut(&proof.request.target)
            .expect("target registered above");

        record.probe_times.push_back(now_us);
        while record.probe_times.len() > self.config.max_probe_history {
            record.probe_times.pop_front();
        }
        let in_window = record
            .probe_times
            .iter()
            .filter(|&&t| now_us.saturating_sub(t) <= self.config.metrics_window_us)
            .count()
            .max(1);
        record.uptime = (record.uptime + 1.0 / in_window as f64).min(1.0);

        let rtt_secs = proof.rtt_us as f64 / 1_000_000.0;
        let alpha = self.config.latency_alpha;
        record.latency = record.latency * (1.0 - alpha) + rtt_secs * alpha;
        record.last_seen_us = now_us;

        self.score_cache.lock().remove(&proof.request.target);
        Ok(())
    }

    /// Record a block-proposal outcome for the scheduled leader.
    /// `tx_count` feeds the throughput window on success.
    pub fn record_proposal(&self, pubkey: &PublicKey, success: bool, tx_count: u64, now_us: u64) {
        let mut nodes = self.nodes.write();
        let Some(record) = nodes.get_mut(pubkey) else {
            return;
        };
        if success {
            record.proposal_success += 1;
            record.trust_score = (record.trust_score + 0.02).min(1.0);
            record.proposal_windows.push_back((now_us, tx_count));
        } else {
            record.proposal_failure += 1;
            record.trust_score = (record.trust_score - 0.05).max(0.0);
        }
        record.refresh_throughput(now_us, self.config.metrics_window_us);
        record.last_seen_us = now_us;
        drop(nodes);
        self.score_cache.lock().remove(pubkey);
    }

    /// Snapshot of one record.
    pub fn get(&self, pubkey: &PublicKey) -> Option<NodeRecord> {
        self.nodes.read().get(pubkey).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Nodes seen within the active threshold.
    pub fn active_nodes(&self, now_us: u64) -> Vec<PublicKey> {
        self.nodes
            .read()
            .values()
            .filter(|r| now_us.saturating_sub(r.last_seen_us) <= self.config.active_threshold_us)
            .map(|r| r.pubkey)
            .collect()
    }

    /// Drop nodes past the inactivity threshold. Returns how many.
    pub fn evict_inactive(&self, now_us: u64) -> usize {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|_, r| now_us.saturating_sub(r.last_seen_us) <= self.config.evict_after_us);
        let removed = before - nodes.len();
        if removed > 0 {
            info!(removed, "evicted inactive nodes");
        }
        removed
    }

    /// Suitability of one node. Reads through the TTL cache.
    pub fn suitability(&self, pubkey: &PublicKey, now_us: u64) -> f64 {
        if let Some(&(score, at)) = self.score_cache.lock().get(pubkey) {
            if now_us.saturating_sub(at) < self.config.score_cache_ttl_us {
                return score;
            }
        }
        self.suitability_scores(now_us)
            .into_iter()
            .find(|(k, _)| k == pubkey)
            .map(|(_, s)| s)
            .unwrap_or(0.0)
    }

    /// Suitability of every active node, normalized across the active
    /// set. Refreshes the cache.
    pub fn suitability_scores(&self, now_us: u64) -> Vec<(PublicKey, f64)> {
        let nodes = self.nodes.read();
        let active: Vec<&NodeRecord> = nodes
            .values()
            .filter(|r| now_us.saturating_sub(r.last_seen_us) <= self.config.active_threshold_us)
            .collect();
        if active.is_empty() {
            return Vec::new();
        }

        let uptimes: Vec<f64> = active.iter().map(|r| r.uptime).collect();
        let rates: Vec<f64> = active.iter().map(|r| r.proposal_success_rate()).collect();
        let throughputs: Vec<f64> = active.iter().map(|r| r.throughput).collect();
        let latencies: Vec<f64> = active.iter().map(|r| r.latency).collect();

        let scores: Vec<(PublicKey, f64)> = active
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let score = self.config.weight_uptime * min_max_norm(uptimes[i], &uptimes)
                    + self.config.weight_proposals * min_max_norm(rates[i], &rates)
                    + self.config.weight_throughput * min_max_norm(throughputs[i], &throughputs)
                    - self.config.weight_latency * min_max_norm(latencies[i], &latencies);
                (r.pubkey, score)
            })
            .collect();
        drop(nodes);

        let mut cache = self.score_cache.lock();
        for (pubkey, score) in &scores {
            cache.insert(*pubkey, (*score, now_us));
        }
        scores
    }

    /// Suitability blended with VRF-seeded noise, so a dominant node
    /// cannot capture every selection round.
    pub fn effective_scores(&self, vrf_seed: &Hash, now_us: u64) -> Vec<(PublicKey, f64)> {
        let rw = self.config.randomness_weight;
        self.suitability_scores(now_us)
            .into_iter()
            .map(|(pubkey, score)| {
                let noise = seeded_noise(vrf_seed, &pubkey);
                (pubkey, (1.0 - rw) * score + rw * noise)
            })
            .collect()
    }

    /// Cluster ids of the given candidates, in order.
    pub fn cluster_ids(&self, candidates: &[PublicKey]) -> Vec<Option<u32>> {
        let nodes = self.nodes.read();
        candidates
            .iter()
            .map(|k| nodes.get(k).and_then(|r| r.cluster_id))
            .collect()
    }
}

/// Min-max normalization over the observed population; degenerate
/// populations (all equal) normalize to a neutral 0.5.
fn min_max_norm(value: f64, population: &[f64]) -> f64 {
    let min = population.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = population.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < 1e-12 {
        0.5
    } else {
        (value - min) / (max - min)
    }
}

/// Deterministic per-node noise in [0, 1) derived from the VRF seed.
fn seeded_noise(vrf_seed: &Hash, pubkey: &PublicKey) -> f64 {
    let digest = sha256_hash_many(&[vrf_seed, pubkey]);
    let raw = u64::from_le_bytes(digest[..8].try_into().expect("digest has 8 bytes"));
    raw as f64 / (u64::MAX as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::probe::probe_round;
    use shared_crypto::P256KeyPair;

    const NOW: u64 = 10_000_000_000;

    fn registry() -> NodeRegistry {
        NodeRegistry::new(ConsensusConfig::default())
    }

    #[test]
    fn test_register_creates_once() {
        let registry = registry();
        registry.register([1u8; 33], NOW);
        registry.register([1u8; 33], NOW + 5);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&[1u8; 33]).unwrap().last_seen_us, NOW + 5);
    }

    #[test]
    fn test_verified_proof_updates_target_latency() {
        let registry = registry();
        let source = P256KeyPair::from_bytes([1u8; 32]).unwrap();
        let target = P256KeyPair::from_bytes([2u8; 32]).unwrap();
        let w1 = P256KeyPair::from_bytes([3u8; 32]).unwrap();
        let w2 = P256KeyPair::from_bytes([4u8; 32]).unwrap();
        let target_key = *target.public_key().as_bytes();

        let proof = probe_round(&source, &target, &[&w1, &w2], 1, NOW, 100_000);
        registry.apply_proof(&proof, NOW).unwrap();

        let record = registry.get(&target_key).unwrap();
        // EMA from the 1.0s default toward 0.1s.
        assert!((record.latency - (1.0 * 0.8 + 0.1 * 0.2)).abs() < 1e-9);
        assert!(record.uptime > 0.0);
    }

    #[test]
    fn test_rejected_proof_updates_nothing() {
        let registry = registry();
        let source = P256KeyPair::from_bytes([1u8; 32]).unwrap();
        let target = P256KeyPair::from_bytes([2u8; 32]).unwrap();
        let w1 = P256KeyPair::from_bytes([3u8; 32]).unwrap();

        // Single witness: quorum not met.
        let proof = probe_round(&source, &target, &[&w1], 1, NOW, 100_000);
        assert!(registry.apply_proof(&proof, NOW).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_better_metrics_score_higher() {
        let registry = registry();
        let fast: PublicKey = [1u8; 33];
        let slow: PublicKey = [2u8; 33];
        registry.register(fast, NOW);
        registry.register(slow, NOW);
        for i in 0..10 {
            registry.record_proposal(&fast, true, 100, NOW + i);
        }
        registry.record_proposal(&fast, false, 0, NOW + 20);
        registry.record_proposal(&slow, true, 5, NOW + 20);
        for i in 0..5 {
            registry.record_proposal(&slow, false, 0, NOW + 30 + i);
        }

        let fast_score = registry.suitability(&fast, NOW + 100);
        let slow_score = registry.suitability(&slow, NOW + 100);
        assert!(fast_score > slow_score);
    }

    #[test]
    fn test_effective_score_is_deterministic_per_seed() {
        let registry = registry();
        registry.register([1u8; 33], NOW);
        registry.register([2u8; 33], NOW);
        let seed = [9u8; 32];
        let once = registry.effective_scores(&seed, NOW);
        let twice = registry.effective_scores(&seed, NOW);
        assert_eq!(once, twice);

        let other = registry.effective_scores(&[8u8; 32], NOW);
        assert_ne!(once, other);
    }

    #[test]
    fn test_eviction_threshold() {
        let registry = registry();
        let config = ConsensusConfig::default();
        registry.register([1u8; 33], NOW);
        registry.register([2u8; 33], NOW + config.evict_after_us);
        let removed = registry.evict_inactive(NOW + config.evict_after_us + 1);
        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_active_nodes_excludes_silent() {
        let registry = registry();
        let config = ConsensusConfig::default();
        registry.register([1u8; 33], NOW);
        registry.register([2u8; 33], NOW + config.active_threshold_us);
        let active = registry.active_nodes(NOW + config.active_threshold_us + 1);
        assert_eq!(active, vec![[2u8; 33]]);
    }

    #[test]
    fn test_throughput_window() {
        let registry = registry();
        let node: PublicKey = [1u8; 33];
        registry.register(node, NOW);
        registry.record_proposal(&node, true, 600, NOW);
        let record = registry.get(&node).unwrap();
        // 600 tx over a 60 s window.
        assert!((record.throughput - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_max_norm_degenerate() {
        assert_eq!(min_max_norm(3.0, &[3.0, 3.0]), 0.5);
        assert_eq!(min_max_norm(1.0, &[1.0, 3.0]), 0.0);
        assert_eq!(min_max_norm(3.0, &[1.0, 3.0]), 1.0);
    }
}
