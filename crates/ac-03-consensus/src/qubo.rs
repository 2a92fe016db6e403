//! QUBO formulation and the simulated-annealing solver.
//!
//! Selection is posed as Quadratic Unconstrained Binary Optimization:
//! one binary variable per candidate, energy
//!
//! ```text
//! E(x) = -sum_i s_i x_i + lambda * (sum_i x_i - 1)^2
//! ```
//!
//! whose ground state sets exactly the best candidate's bit. Optional
//! pairwise terms penalize picking same-cluster candidates. The solver
//! is classical simulated annealing over `num_reads` restarts with an
//! exponential temperature schedule and Metropolis acceptance, driven
//! by a ChaCha20 RNG so identical seeds reproduce identical selections.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::config::ConsensusConfig;

/// A QUBO instance over `n` binary variables.
#[derive(Debug, Clone)]
pub struct QuboProblem {
    /// Diagonal coefficients.
    pub linear: Vec<f64>,
    /// Upper-triangular pairwise coefficients, `quadratic[i][j - i - 1]`
    /// for `j > i`.
    pub quadratic: Vec<Vec<f64>>,
    /// Constant offset; irrelevant for argmin but kept so energies match
    /// the written objective.
    pub offset: f64,
}

impl QuboProblem {
    /// Build the selection problem from effective scores and optional
    /// cluster assignments.
    ///
    /// Expanding `lambda * (sum x - 1)^2` over binary variables gives
    /// `-lambda` on each diagonal and `+2 lambda` on each pair; the
    /// score term subtracts `s_i` from the diagonal. Same-cluster pairs
    /// get an extra penalty so the shortlist's diversity survives into
    /// the ground state.
    pub fn build(scores: &[f64], clusters: &[Option<u32>], config: &ConsensusConfig) -> Self {
        let max_abs = scores.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        let lambda = 2.0 * max_abs + 1.0;
        let diversity = config.cluster_diversity_factor * lambda;

        let n = scores.len();
        let linear: Vec<f64> = scores.iter().map(|s| -s - lambda).collect();
        let quadratic: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (i + 1..n)
                    .map(|j| {
                        let mut coeff = 2.0 * lambda;
                        if let (Some(a), Some(b)) = (clusters.get(i), clusters.get(j)) {
                            if a.is_some() && a == b {
                                coeff += diversity;
                            }
                        }
                        coeff
                    })
                    .collect()
            })
            .collect();

        Self {
            linear,
            quadratic,
            offset: lambda,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.linear.len()
    }

    fn pair(&self, i: usize, j: usize) -> f64 {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.quadratic[lo][hi - lo - 1]
    }

    /// Energy of an assignment.
    pub fn energy(&self, x: &[bool]) -> f64 {
        let mut energy = self.offset;
        for i in 0..x.len() {
            if !x[i] {
                continue;
            }
            energy += self.linear[i];
            for j in i + 1..x.len() {
                if x[j] {
                    energy += self.pair(i, j);
                }
            }
        }
        energy
    }

    /// Energy change from flipping variable `i`.
    fn flip_delta(&self, x: &[bool], i: usize) -> f64 {
        let mut field = self.linear[i];
        for j in 0..x.len() {
            if j != i && x[j] {
                field += self.pair(i, j);
            }
        }
        if x[i] {
            -field
        } else {
            field
        }
    }
}

/// Deterministic simulated-annealing solver.
pub struct Annealer {
    config: ConsensusConfig,
}

impl Annealer {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    /// Return the index of the selected candidate: the lowest-energy
    /// one-hot sample over all reads, ties broken by higher score. Falls
    /// back to the best score if no read ever lands one-hot.
    pub fn solve(&self, problem: &QuboProblem, scores: &[f64], seed: u64) -> Option<usize> {
        let n = problem.num_variables();
        if n == 0 {
            return None;
        }
        if n == 1 {
            return Some(0);
        }

        let num_reads = self.config.num_reads(n);
        let sweeps = self.config.annealing_time_us.max(1) as usize;
        let t0 = self.config.temp_initial;
        let t1 = self.config.temp_final.max(1e-6);

        let mut master = ChaCha20Rng::seed_from_u64(seed);
        let mut best: Option<(f64, usize)> = None;

        for _read in 0..num_reads {
            let mut rng = ChaCha20Rng::seed_from_u64(master.next_u64());

            // Start from a random one-hot assignment; the penalty wall
            // around it is what the schedule has to climb.
            let mut x = vec![false; n];
            x[rng.gen_range(0..n)] = true;

            for sweep in 0..sweeps {
                let progress = sweep as f64 / (sweeps.max(2) - 1) as f64;
                let temperature = t0 * (t1 / t0).powf(progress);

                for _ in 0..n {
                    let i = rng.gen_range(0..n);
                    let delta = problem.flip_delta(&x, i);
                    if delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                        x[i] = !x[i];
                    }
                }

                consider_sample(problem, scores, &x, &mut best);
            }
            consider_sample(problem, scores, &x, &mut best);
        }

        match best {
            Some((energy, index)) => {
                trace!(index, energy, "annealer converged");
                Some(index)
            }
            // Degenerate outcome; pick the best score deterministically.
            None => scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i),
        }
    }
}

fn consider_sample(
    problem: &QuboProblem,
    scores: &[f64],
    x: &[bool],
    best: &mut Option<(f64, usize)>,
) {
    let ones: Vec<usize> = (0..x.len()).filter(|&i| x[i]).collect();
    if ones.len() != 1 {
        return;
    }
    let index = ones[0];
    let energy = problem.energy(x);
    match best {
        None => *best = Some((energy, index)),
        Some((best_energy, best_index)) => {
            let better = energy < *best_energy - 1e-12;
            let tied = (energy - *best_energy).abs() <= 1e-12;
            if better || (tied && scores[index] > scores[*best_index]) {
                *best = Some((energy, index));
            }
        }
    }
}
