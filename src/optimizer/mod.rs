//! Training entry points and trained models
//!
//! `SVMOptimizer` wires a kernel and solver configuration to the SMO
//! solver; `TrainedSVM` evaluates the resulting decision function and,
//! when calibrated, Platt-scaled probabilities.

pub mod platt;

pub use self::platt::PlattScaling;

use crate::core::{
    Dataset, OptimizationResult, PipelineError, Prediction, Result, SVMModel, Sample, SolverConfig,
};
use crate::kernel::Kernel;
use crate::solver::SMOSolver;
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// SVM trainer that integrates a kernel function with the SMO solver
pub struct SVMOptimizer<K: Kernel> {
    kernel: Arc<K>,
    config: SolverConfig,
}

impl<K: Kernel> SVMOptimizer<K> {
    pub fn new(kernel: K, config: SolverConfig) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config,
        }
    }

    /// Create a new SVM optimizer with default configuration
    pub fn with_kernel(kernel: K) -> Self {
        Self::new(kernel, SolverConfig::default())
    }

    /// Train an SVM model on the given dataset
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<TrainedSVM<K>> {
        let samples: Vec<Sample> = (0..dataset.len()).map(|i| dataset.get_sample(i)).collect();
        self.train_samples(&samples)
    }

    /// Train an SVM model on a slice of samples
    pub fn train_samples(&self, samples: &[Sample]) -> Result<TrainedSVM<K>> {
        let solver = SMOSolver::new(Arc::clone(&self.kernel), self.config.clone());
        let result = solver.solve(samples)?;
        Ok(TrainedSVM::new(Arc::clone(&self.kernel), samples, result))
    }

    /// Train on all samples and calibrate probabilities on out-of-fold
    /// decision values from an internal `folds`-fold split
    ///
    /// With fewer than two usable folds the sigmoid is fitted on the
    /// in-sample decision values instead.
    pub fn train_with_probability(
        &self,
        samples: &[Sample],
        folds: usize,
        seed: u64,
    ) -> Result<TrainedSVM<K>> {
        let mut model = self.train_samples(samples)?;

        let folds = folds.min(samples.len());
        let decision_values = if folds < 2 {
            debug!("Calibrating on in-sample decision values");
            samples.iter().map(|s| model.decision_function(s)).collect()
        } else {
            self.out_of_fold_decisions(samples, folds, seed)?
        };

        let labels: Vec<f64> = samples.iter().map(|s| s.label).collect();
        model.calibration = Some(PlattScaling::fit(&decision_values, &labels)?);
        Ok(model)
    }

    fn out_of_fold_decisions(
        &self,
        samples: &[Sample],
        folds: usize,
        seed: u64,
    ) -> Result<Vec<f64>> {
        let n = samples.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let mut decisions = vec![0.0; n];
        for fold in 0..folds {
            let start = fold * n / folds;
            let end = (fold + 1) * n / folds;
            let held_out = &order[start..end];

            let train: Vec<Sample> = order[..start]
                .iter()
                .chain(&order[end..])
                .map(|&i| samples[i].clone())
                .collect();

            let positives = train.iter().filter(|s| s.label > 0.0).count();
            if positives == 0 || positives == train.len() {
                // One class left: every held-out row gets that class's margin
                let value = if positives == 0 { -1.0 } else { 1.0 };
                for &i in held_out {
                    decisions[i] = value;
                }
                continue;
            }

            let fold_model = self.train_samples(&train)?;
            for &i in held_out {
                decisions[i] = fold_model.decision_function(&samples[i]);
            }
        }
        Ok(decisions)
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// A trained SVM model that can make predictions
pub struct TrainedSVM<K: Kernel> {
    kernel: Arc<K>,
    support_vectors: Vec<Sample>,
    alpha: Vec<f64>,
    bias: f64,
    support_indices: Vec<usize>,
    iterations: usize,
    calibration: Option<PlattScaling>,
}

impl<K: Kernel> TrainedSVM<K> {
    pub(crate) fn new(
        kernel: Arc<K>,
        training_samples: &[Sample],
        optimization_result: OptimizationResult,
    ) -> Self {
        let support_vectors = optimization_result
            .support_vectors
            .iter()
            .map(|&i| training_samples[i].clone())
            .collect();
        let alpha = optimization_result
            .support_vectors
            .iter()
            .map(|&i| optimization_result.alpha[i])
            .collect();

        Self {
            kernel,
            support_vectors,
            alpha,
            bias: optimization_result.b,
            support_indices: optimization_result.support_vectors,
            iterations: optimization_result.iterations,
            calibration: None,
        }
    }

    /// f(x) = Σ αᵢ yᵢ K(xᵢ, x) + b
    pub fn decision_function(&self, sample: &Sample) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.alpha)
            .map(|(sv, &alpha)| alpha * sv.label * self.kernel.compute(&sv.features, &sample.features))
            .sum::<f64>()
            + self.bias
    }

    /// Probability that the sample belongs to the positive class
    pub fn predict_proba(&self, sample: &Sample) -> Result<f64> {
        let calibration = self.calibration.ok_or(PipelineError::NotCalibrated)?;
        Ok(calibration.probability(self.decision_function(sample)))
    }

    pub fn calibration(&self) -> Option<&PlattScaling> {
        self.calibration.as_ref()
    }

    pub fn support_vectors(&self) -> &[Sample] {
        &self.support_vectors
    }

    /// Alpha values of the support vectors
    pub fn alpha_values(&self) -> &[f64] {
        &self.alpha
    }

    /// Indices of support vectors in the training set
    pub fn support_vector_indices(&self) -> &[usize] {
        &self.support_indices
    }

    /// Solver passes used during training
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K: Kernel> SVMModel for TrainedSVM<K> {
    fn predict(&self, sample: &Sample) -> Prediction {
        let decision_value = self.decision_function(sample);
        let label = if decision_value > 0.0 { 1.0 } else { -1.0 };
        Prediction::new(label, decision_value)
    }

    fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    fn bias(&self) -> f64 {
        self.bias
    }
}
