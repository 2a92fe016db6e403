//! Representative selection: shortlist by effective score, pose the
//! QUBO, anneal with a VRF-derived seed.

use std::sync::Arc;
use tracing::debug;

use shared_crypto::vrf::seed_from_output;
use shared_types::{Hash, PublicKey};

use crate::domain::registry::NodeRegistry;
use crate::qubo::{Annealer, QuboProblem};

/// Picks one representative per selection round.
pub struct CandidateSelector {
    registry: Arc<NodeRegistry>,
    annealer: Annealer,
}

impl CandidateSelector {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        let annealer = Annealer::new(registry.config().clone());
        Self { registry, annealer }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Select a representative for the round seeded by `vrf_seed`.
    /// Deterministic: the same active set, metrics, and seed always
    /// yield the same pubkey. Returns `None` with no active nodes.
    pub fn select_representative(&self, vrf_seed: &Hash, now_us: u64) -> Option<PublicKey> {
        let mut scored = self.registry.effective_scores(vrf_seed, now_us);
        if scored.is_empty() {
            return None;
        }
        if scored.len() == 1 {
            return Some(scored[0].0);
        }

        // Deterministic shortlist order: score descending, pubkey as the
        // tiebreak (the map behind the registry has no stable order).
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let limit = self.registry.config().candidate_limit(scored.len());
        scored.truncate(limit);

        let candidates: Vec<PublicKey> = scored.iter().map(|(k, _)| *k).collect();
        let scores: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();
        let clusters = self.registry.cluster_ids(&candidates);

        let problem = QuboProblem::build(&scores, &clusters, self.registry.config());
        let seed = seed_from_output(vrf_seed);
        let winner = self.annealer.solve(&problem, &scores, seed)?;

        debug!(
            candidates = candidates.len(),
            winner = %hex::encode(&candidates[winner][..4]),
            "representative selected"
        );
        Some(candidates[winner])
    }
}
