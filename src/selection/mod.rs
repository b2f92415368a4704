//! Kernel selection by stratified cross-validation

use crate::core::{PipelineError, Result, Sample, SolverConfig};
use crate::data::LabeledData;
use crate::kernel::{Gamma, KernelKind, SvmKernel};
use crate::metrics::roc_auc_score;
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use log::{debug, info, warn};
use serde::Serialize;

/// K-fold splitter that keeps the class ratio in every fold
///
/// Indices are not shuffled. Fold sizes per class come from dealing the
/// class-sorted labels round-robin over the folds, so leftovers of one
/// class continue where the previous class stopped. Each class's indices
/// then fill the folds in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// `(train, validation)` index pairs, one per fold
    pub fn split(&self, labels: &[u8]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(PipelineError::InvalidParameter(format!(
                "cross-validation needs at least 2 folds, got: {k}"
            )));
        }
        if k > labels.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "cannot split {} samples into {} folds",
                labels.len(),
                k
            )));
        }

        // Classes in order of first appearance
        let mut classes: Vec<u8> = Vec::with_capacity(2);
        for &label in labels {
            if !classes.contains(&label) {
                classes.push(label);
            }
        }
        let members: Vec<Vec<usize>> = classes
            .iter()
            .map(|&class| (0..labels.len()).filter(|&i| labels[i] == class).collect())
            .collect();

        // Deal the class-sorted labels round-robin to get each fold's
        // per-class counts
        let mut allocation = vec![vec![0usize; classes.len()]; k];
        let mut position = 0;
        for (c, class_members) in members.iter().enumerate() {
            for _ in class_members {
                allocation[position % k][c] += 1;
                position += 1;
            }
        }

        let mut fold_of = vec![0usize; labels.len()];
        for (c, class_members) in members.iter().enumerate() {
            if class_members.len() < k {
                warn!(
                    "Class {} has only {} members, fewer than {} folds",
                    classes[c],
                    class_members.len(),
                    k
                );
            }

            let mut offset = 0;
            for (fold, counts) in allocation.iter().enumerate() {
                for &i in &class_members[offset..offset + counts[c]] {
                    fold_of[i] = fold;
                }
                offset += counts[c];
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_of[i] == fold);
                (train, validation)
            })
            .collect())
    }
}

/// Cross-validated ROC-AUC of one kernel candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub kernel: KernelKind,
    /// AUC of every scored fold, in fold order
    pub fold_scores: Vec<f64>,
    /// `None` when no fold could be scored
    pub mean_auc: Option<f64>,
}

pub struct GridSearchResult {
    pub best_kernel: KernelKind,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
    /// Winner refit on all samples, with probability calibration
    pub model: TrainedSVM<SvmKernel>,
}

/// Exhaustive search over kernel families scored by mean fold ROC-AUC
#[derive(Debug, Clone)]
pub struct GridSearch {
    kernels: Vec<KernelKind>,
    folds: usize,
    solver: SolverConfig,
    gamma: Gamma,
    probability_folds: usize,
    seed: u64,
}

impl GridSearch {
    pub fn new(kernels: Vec<KernelKind>) -> Self {
        Self {
            kernels,
            folds: 5,
            solver: SolverConfig::default(),
            gamma: Gamma::Scale,
            probability_folds: 5,
            seed: 42,
        }
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver = config;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    /// Internal folds and seed of the probability calibration refit
    pub fn with_probability(mut self, folds: usize, seed: u64) -> Self {
        self.probability_folds = folds;
        self.seed = seed;
        self
    }

    pub fn kernels(&self) -> &[KernelKind] {
        &self.kernels
    }

    pub fn fit(&self, data: &LabeledData) -> Result<GridSearchResult> {
        if self.kernels.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "no kernel candidates to search".to_string(),
            ));
        }

        let splits = StratifiedKFold::new(self.folds).split(data.labels())?;
        let samples = data.samples();

        let mut candidates = Vec::with_capacity(self.kernels.len());
        let mut best: Option<(KernelKind, f64)> = None;

        for &kind in &self.kernels {
            let candidate = self.score_candidate(kind, &samples, data.labels(), &splits)?;
            match candidate.mean_auc {
                Some(mean) => {
                    info!("Kernel {}: mean CV AUC {:.4}", kind, mean);
                    if best.map_or(true, |(_, score)| mean > score) {
                        best = Some((kind, mean));
                    }
                }
                None => warn!("Kernel {}: no fold could be scored, skipping", kind),
            }
            candidates.push(candidate);
        }

        let (best_kernel, best_score) = best.ok_or_else(|| {
            PipelineError::UndefinedMetric(
                "no kernel candidate could be scored by cross-validation".to_string(),
            )
        })?;
        info!("Best kernel: {} (mean CV AUC {:.4})", best_kernel, best_score);

        let kernel = best_kernel.build(self.gamma.resolve(&samples));
        let model = SVMOptimizer::new(kernel, self.solver.clone()).train_with_probability(
            &samples,
            self.probability_folds,
            self.seed,
        )?;

        Ok(GridSearchResult {
            best_kernel,
            best_score,
            candidates,
            model,
        })
    }

    fn score_candidate(
        &self,
        kind: KernelKind,
        samples: &[Sample],
        labels: &[u8],
        splits: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<CandidateScore> {
        let mut fold_scores = Vec::with_capacity(splits.len());

        for (fold, (train_idx, validation_idx)) in splits.iter().enumerate() {
            let validation_labels: Vec<u8> = validation_idx.iter().map(|&i| labels[i]).collect();
            let positives = validation_labels.iter().filter(|&&l| l == 1).count();
            if positives == 0 || positives == validation_labels.len() {
                warn!(
                    "Kernel {} fold {}: validation part holds one class, skipping",
                    kind, fold
                );
                continue;
            }

            let train: Vec<Sample> = train_idx.iter().map(|&i| samples[i].clone()).collect();
            let kernel = kind.build(self.gamma.resolve(&train));
            let model = SVMOptimizer::new(kernel, self.solver.clone()).train_samples(&train)?;

            let scores: Vec<f64> = validation_idx
                .iter()
                .map(|&i| model.decision_function(&samples[i]))
                .collect();
            let auc = roc_auc_score(&validation_labels, &scores)?;
            debug!(
                "Kernel {} fold {}: AUC {:.4} ({} iterations)",
                kind,
                fold,
                auc,
                model.iterations()
            );
            fold_scores.push(auc);
        }

        let mean_auc = if fold_scores.is_empty() {
            None
        } else {
            Some(fold_scores.iter().sum::<f64>() / fold_scores.len() as f64)
        };

        Ok(CandidateScore {
            kernel: kind,
            fold_scores,
            mean_auc,
        })
    }
}
