//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the C-SVC dual by repeatedly optimizing pairs of Lagrange
//! multipliers, following Platt's outer loop (alternating full sweeps and
//! sweeps over non-bound multipliers) and second-choice heuristic.

use crate::cache::KernelCache;
use crate::core::{OptimizationResult, PipelineError, Result, Sample, SolverConfig};
use crate::kernel::Kernel;
use log::{debug, warn};
use std::sync::Arc;

/// Curvature used when the kernel gives a non-positive eta
const TAU: f64 = 1e-12;

/// Multipliers closer than this to a bound are snapped onto it
const BOUND_EPS: f64 = 1e-8;

/// SMO solver for SVM optimization
pub struct SMOSolver<K: Kernel> {
    kernel: Arc<K>,
    config: SolverConfig,
}

impl<K: Kernel> SMOSolver<K> {
    pub fn new(kernel: Arc<K>, config: SolverConfig) -> Self {
        Self { kernel, config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve the SVM optimization problem
    ///
    /// Returns the alpha values, bias term and support vector indices.
    pub fn solve(&self, samples: &[Sample]) -> Result<OptimizationResult> {
        self.validate(samples)?;

        let n = samples.len();
        let first_label = samples[0].label;
        if samples.iter().all(|s| s.label == first_label) {
            debug!("All {n} samples share label {first_label}; returning constant model");
            return Ok(OptimizationResult {
                alpha: vec![0.0; n],
                b: first_label,
                support_vectors: Vec::new(),
                iterations: 0,
                objective_value: 0.0,
            });
        }

        let mut state = SmoState {
            kernel: self.kernel.as_ref(),
            samples,
            cache: KernelCache::for_samples(n, self.config.cache_size),
            alpha: vec![0.0; n],
            // E_i = f(x_i) - y_i, and f is identically 0 before the first step
            errors: samples.iter().map(|s| -s.label).collect(),
            b: 0.0,
            c: self.config.c,
            epsilon: self.config.epsilon,
        };

        let mut iterations = 0;
        let mut num_changed = 0;
        let mut examine_all = true;

        while (num_changed > 0 || examine_all) && iterations < self.config.max_iterations {
            num_changed = 0;

            for i in 0..n {
                if (examine_all || state.is_non_bound(i)) && state.examine_example(i) {
                    num_changed += 1;
                }
            }

            if examine_all {
                examine_all = false;
            } else if num_changed == 0 {
                examine_all = true;
            }

            iterations += 1;
        }

        if num_changed > 0 || examine_all {
            warn!(
                "SMO stopped at the iteration limit ({}) before convergence",
                self.config.max_iterations
            );
        }

        state.refine_bias();

        let support_vectors: Vec<usize> = state
            .alpha
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| if a > 0.0 { Some(i) } else { None })
            .collect();
        let objective_value = state.objective(&support_vectors);

        debug!(
            "SMO finished: {} passes, {} support vectors, bias {:.6}, cache hit rate {:.3}",
            iterations,
            support_vectors.len(),
            state.b,
            state.cache.hit_rate()
        );

        Ok(OptimizationResult {
            alpha: state.alpha,
            b: state.b,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    fn validate(&self, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no training samples for the solver".to_string(),
            ));
        }
        if !(self.config.c > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.config.c
            )));
        }

        let dim = samples[0].dim();
        for sample in samples {
            if sample.label != 1.0 && sample.label != -1.0 {
                return Err(PipelineError::InvalidLabel(format!(
                    "expected -1 or +1, got {}",
                    sample.label
                )));
            }
            if sample.dim() != dim {
                return Err(PipelineError::DimensionMismatch {
                    expected: dim,
                    actual: sample.dim(),
                });
            }
        }
        Ok(())
    }
}

/// Mutable optimization state for one solve
struct SmoState<'a, K: Kernel> {
    kernel: &'a K,
    samples: &'a [Sample],
    cache: KernelCache,
    alpha: Vec<f64>,
    errors: Vec<f64>,
    b: f64,
    c: f64,
    epsilon: f64,
}

impl<'a, K: Kernel> SmoState<'a, K> {
    fn k(&mut self, i: usize, j: usize) -> f64 {
        let kernel = self.kernel;
        let samples = self.samples;
        self.cache.get_or_compute(i, j, || {
            kernel.compute(&samples[i].features, &samples[j].features)
        })
    }

    fn is_non_bound(&self, i: usize) -> bool {
        self.alpha[i] > 0.0 && self.alpha[i] < self.c
    }

    /// Try to make progress on the pair formed by `i2` and a partner
    fn examine_example(&mut self, i2: usize) -> bool {
        let y2 = self.samples[i2].label;
        let alpha2 = self.alpha[i2];
        let e2 = self.errors[i2];
        let r2 = e2 * y2;

        if !((r2 < -self.epsilon && alpha2 < self.c) || (r2 > self.epsilon && alpha2 > 0.0)) {
            return false;
        }

        // Partner maximizing |E1 - E2| among non-bound multipliers
        let mut best = None;
        let mut max_diff = -1.0;
        for i1 in 0..self.samples.len() {
            if i1 != i2 && self.is_non_bound(i1) {
                let diff = (self.errors[i1] - e2).abs();
                if diff > max_diff {
                    max_diff = diff;
                    best = Some(i1);
                }
            }
        }
        if let Some(i1) = best {
            if self.take_step(i1, i2) {
                return true;
            }
        }

        let n = self.samples.len();
        let start = (i2 + 1) % n;

        for offset in 0..n {
            let i1 = (start + offset) % n;
            if self.is_non_bound(i1) && self.take_step(i1, i2) {
                return true;
            }
        }

        for offset in 0..n {
            let i1 = (start + offset) % n;
            if self.take_step(i1, i2) {
                return true;
            }
        }

        false
    }

    /// Jointly optimize alpha[i1] and alpha[i2]
    fn take_step(&mut self, i1: usize, i2: usize) -> bool {
        if i1 == i2 {
            return false;
        }

        let c = self.c;
        let y1 = self.samples[i1].label;
        let y2 = self.samples[i2].label;
        let alpha1 = self.alpha[i1];
        let alpha2 = self.alpha[i2];
        let e1 = self.errors[i1];
        let e2 = self.errors[i2];
        let s = y1 * y2;

        let (low, high) = if y1 != y2 {
            ((alpha2 - alpha1).max(0.0), (c + alpha2 - alpha1).min(c))
        } else {
            ((alpha1 + alpha2 - c).max(0.0), (alpha1 + alpha2).min(c))
        };
        if high - low < TAU {
            return false;
        }

        let k11 = self.k(i1, i1);
        let k12 = self.k(i1, i2);
        let k22 = self.k(i2, i2);
        let eta = k11 + k22 - 2.0 * k12;
        let eta = if eta > 0.0 { eta } else { TAU };

        let mut a2 = (alpha2 + y2 * (e1 - e2) / eta).clamp(low, high);
        if a2 < BOUND_EPS {
            a2 = 0.0;
        } else if a2 > c - BOUND_EPS {
            a2 = c;
        }

        if (a2 - alpha2).abs() < self.epsilon * (a2 + alpha2 + self.epsilon) {
            return false;
        }

        let mut a1 = alpha1 + s * (alpha2 - a2);
        if a1 < BOUND_EPS {
            a1 = 0.0;
        } else if a1 > c - BOUND_EPS {
            a1 = c;
        }

        let delta1 = y1 * (a1 - alpha1);
        let delta2 = y2 * (a2 - alpha2);

        let b1 = self.b - e1 - delta1 * k11 - delta2 * k12;
        let b2 = self.b - e2 - delta1 * k12 - delta2 * k22;
        let new_b = if a1 > 0.0 && a1 < c {
            b1
        } else if a2 > 0.0 && a2 < c {
            b2
        } else {
            (b1 + b2) / 2.0
        };
        let delta_b = new_b - self.b;

        for k in 0..self.samples.len() {
            let k1k = self.k(i1, k);
            let k2k = self.k(i2, k);
            self.errors[k] += delta1 * k1k + delta2 * k2k + delta_b;
        }

        self.alpha[i1] = a1;
        self.alpha[i2] = a2;
        self.b = new_b;
        true
    }

    /// Re-center the bias on the free support vectors, whose errors
    /// vanish at the optimum
    fn refine_bias(&mut self) {
        let free: Vec<usize> = (0..self.samples.len())
            .filter(|&i| self.is_non_bound(i))
            .collect();
        if free.is_empty() {
            return;
        }

        let mean_error = free.iter().map(|&i| self.errors[i]).sum::<f64>() / free.len() as f64;
        self.b -= mean_error;
        for e in self.errors.iter_mut() {
            *e -= mean_error;
        }
    }

    /// Dual objective: Σα - ½ ΣΣ αᵢαⱼyᵢyⱼK(xᵢ,xⱼ)
    fn objective(&mut self, support_vectors: &[usize]) -> f64 {
        let mut obj: f64 = support_vectors.iter().map(|&i| self.alpha[i]).sum();
        for &i in support_vectors {
            for &j in support_vectors {
                let k_ij = self.k(i, j);
                obj -= 0.5
                    * self.alpha[i]
                    * self.alpha[j]
                    * self.samples[i].label
                    * self.samples[j].label
                    * k_ij;
            }
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LinearKernel, RBFKernel, SigmoidKernel};
    use approx::assert_relative_eq;

    fn linear_solver(config: SolverConfig) -> SMOSolver<LinearKernel> {
        SMOSolver::new(Arc::new(LinearKernel::new()), config)
    }

    fn decision(result: &OptimizationResult, samples: &[Sample], x: &[f64]) -> f64 {
        let kernel = LinearKernel::new();
        result
            .support_vectors
            .iter()
            .map(|&i| result.alpha[i] * samples[i].label * kernel.compute(&samples[i].features, x))
            .sum::<f64>()
            + result.b
    }

    #[test]
    fn test_smo_solver_empty_dataset() {
        let solver = linear_solver(SolverConfig::default());
        let result = solver.solve(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyDataset(_))));
    }

    #[test]
    fn test_smo_solver_invalid_labels() {
        let solver = linear_solver(SolverConfig::default());
        let samples = vec![Sample::new(vec![1.0], 0.5)];
        assert!(matches!(
            solver.solve(&samples),
            Err(PipelineError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_smo_solver_dimension_mismatch() {
        let solver = linear_solver(SolverConfig::default());
        let samples = vec![
            Sample::new(vec![1.0, 2.0], 1.0),
            Sample::new(vec![1.0], -1.0),
        ];
        assert!(matches!(
            solver.solve(&samples),
            Err(PipelineError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_smo_solver_rejects_non_positive_c() {
        let mut config = SolverConfig::default();
        config.c = 0.0;
        let solver = linear_solver(config);
        let samples = vec![
            Sample::new(vec![1.0], 1.0),
            Sample::new(vec![-1.0], -1.0),
        ];
        assert!(matches!(
            solver.solve(&samples),
            Err(PipelineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_two_point_analytic_solution() {
        // Optimal hyperplane x = 0 with margin 1: w = 1, b = 0, alpha = 0.5
        let solver = linear_solver(SolverConfig::default());
        let samples = vec![
            Sample::new(vec![1.0], 1.0),
            Sample::new(vec![-1.0], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve successfully");

        assert_relative_eq!(result.alpha[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(result.alpha[1], 0.5, epsilon = 1e-9);
        assert_relative_eq!(result.b, 0.0, epsilon = 1e-9);
        assert_eq!(result.support_vectors, vec![0, 1]);
        // Σα - ½‖w‖² = 1 - 0.5
        assert_relative_eq!(result.objective_value, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_smo_solver_linearly_separable() {
        let solver = linear_solver(SolverConfig::default());
        let samples = vec![
            Sample::new(vec![2.0, 1.0], 1.0),
            Sample::new(vec![1.5, 0.8], 1.0),
            Sample::new(vec![1.8, 1.2], 1.0),
            Sample::new(vec![-2.0, -1.0], -1.0),
            Sample::new(vec![-1.5, -0.8], -1.0),
            Sample::new(vec![-1.8, -1.2], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve");

        assert!(result.iterations > 0);
        assert!(!result.support_vectors.is_empty());
        for sample in &samples {
            let f = decision(&result, &samples, &sample.features);
            assert_eq!(f.signum(), sample.label);
        }

        // Equality constraint Σ αᵢyᵢ = 0
        let balance: f64 = samples
            .iter()
            .zip(&result.alpha)
            .map(|(s, a)| a * s.label)
            .sum();
        assert_relative_eq!(balance, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_alphas_respect_box_constraint() {
        let mut config = SolverConfig::default();
        config.c = 0.1;
        let solver = linear_solver(config);

        // Overlapping classes force multipliers to the upper bound
        let samples = vec![
            Sample::new(vec![1.0, 0.5], 1.0),
            Sample::new(vec![0.8, 0.4], -1.0),
            Sample::new(vec![-1.0, -0.2], -1.0),
            Sample::new(vec![-0.7, -0.1], 1.0),
            Sample::new(vec![0.2, 0.9], 1.0),
            Sample::new(vec![0.1, -0.9], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve");
        for &a in &result.alpha {
            assert!((0.0..=0.1).contains(&a), "alpha out of bounds: {a}");
        }
    }

    #[test]
    fn test_single_class_gives_constant_model() {
        let solver = linear_solver(SolverConfig::default());
        let samples = vec![
            Sample::new(vec![1.0], -1.0),
            Sample::new(vec![2.0], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve");
        assert!(result.support_vectors.is_empty());
        assert_eq!(result.b, -1.0);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_smo_solver_max_iterations() {
        let mut config = SolverConfig::default();
        config.max_iterations = 1;
        config.epsilon = 0.00001;
        let solver = linear_solver(config);

        let samples = vec![
            Sample::new(vec![1.0, 1.0], 1.0),
            Sample::new(vec![-1.0, -1.0], -1.0),
            Sample::new(vec![1.0, -1.0], 1.0),
            Sample::new(vec![-1.0, 1.0], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve");
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_rbf_solves_xor() {
        let solver = SMOSolver::new(Arc::new(RBFKernel::new(1.0)), {
            let mut config = SolverConfig::default();
            config.c = 10.0;
            config
        });

        let samples = vec![
            Sample::new(vec![1.0, 1.0], 1.0),
            Sample::new(vec![-1.0, -1.0], 1.0),
            Sample::new(vec![1.0, -1.0], -1.0),
            Sample::new(vec![-1.0, 1.0], -1.0),
        ];

        let result = solver.solve(&samples).expect("Should solve");
        let kernel = RBFKernel::new(1.0);
        for sample in &samples {
            let f: f64 = result
                .support_vectors
                .iter()
                .map(|&i| {
                    result.alpha[i]
                        * samples[i].label
                        * kernel.compute(&samples[i].features, &sample.features)
                })
                .sum::<f64>()
                + result.b;
            assert_eq!(f.signum(), sample.label);
        }
    }

    #[test]
    fn test_sigmoid_kernel_terminates() {
        // Non-PSD kernel: the solver must still terminate with bounded alphas
        let solver = SMOSolver::new(Arc::new(SigmoidKernel::new(2.0, -1.0)), {
            let mut config = SolverConfig::default();
            config.max_iterations = 200;
            config
        });

        let samples: Vec<Sample> = (0..12)
            .map(|i| {
                let x = i as f64 / 6.0 - 1.0;
                Sample::new(vec![x, x * x], if i % 3 == 0 { 1.0 } else { -1.0 })
            })
            .collect();

        let result = solver.solve(&samples).expect("Should solve");
        assert!(result.iterations <= 200);
        for &a in &result.alpha {
            assert!((0.0..=1.0).contains(&a));
        }
    }
}
