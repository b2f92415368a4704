//! High-level pipeline API
//!
//! `Pipeline` runs the whole biopsy classification workflow: load and
//! clean the table, select features, impute, split, scale, search the
//! kernel by cross-validated ROC-AUC and evaluate the winner on the
//! held-out partition.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use biopsy_svm::api::Pipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = Pipeline::new()
//!     .with_seed(42)
//!     .with_test_size(0.3)
//!     .run_csv("risk_factors_cervical_cancer.csv")?;
//!
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

use crate::config::PipelineConfig;
use crate::core::{Dataset, Result, SVMModel, Sample};
use crate::data::{CleaningSummary, LabeledData, RawTable};
use crate::kernel::KernelKind;
use crate::metrics::{roc_auc_score, ClassificationReport, EvaluationMetrics};
use crate::selection::{CandidateScore, GridSearch};
use crate::utils::imputation::MedianImputer;
use crate::utils::scaling::StandardScaler;
use crate::utils::split::train_test_split;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Classification pipeline with builder-style configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Pipeline with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Seed of the train/test split and the probability calibration
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Fraction of rows held out for evaluation
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.config.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    /// Kernel candidates, searched in the given order
    pub fn with_kernels(mut self, kernels: Vec<KernelKind>) -> Self {
        self.config.kernels = kernels;
        self
    }

    pub fn with_features<S: Into<String>>(mut self, features: Vec<S>) -> Self {
        self.config.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load and clean a CSV file without training anything
    pub fn clean_csv<P: AsRef<Path>>(&self, path: P) -> Result<CleaningSummary> {
        let mut table = RawTable::from_file(path)?;
        Ok(table.clean(&self.config.missing_markers))
    }

    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<PipelineReport> {
        let table = RawTable::from_file(path)?;
        self.run_table(table)
    }

    pub fn run_table(&self, mut table: RawTable) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;

        let cleaning = table.clean(&config.missing_markers);
        let data = LabeledData::from_table(&table, &config.features, &config.label)?;

        let split = train_test_split(data.len(), config.test_size, config.seed)?;
        let train = data.subset(&split.train);
        let test = data.subset(&split.test);

        // Medians come from the training partition only
        let imputer = MedianImputer::fit(train.features())?;
        let gaps = MedianImputer::count_missing(train.features())
            + MedianImputer::count_missing(test.features());
        if gaps > 0 {
            info!("Imputing {} missing feature values with training medians", gaps);
        }
        let train_features = imputer.transform(train.features())?;
        let test_features = imputer.transform(test.features())?;

        let scaler = StandardScaler::fit(&train_features)?;
        debug!("Scaler means: {:?}", scaler.means());
        let train = train.with_features(scaler.transform(&train_features)?)?;
        let test = test.with_features(scaler.transform(&test_features)?)?;

        let search = GridSearch::new(config.kernels.clone())
            .with_folds(config.cv_folds)
            .with_solver_config(config.solver_config())
            .with_probability(config.probability_folds, config.seed)
            .fit(&train)?;
        let model = &search.model;

        let test_samples: Vec<Sample> = test.samples();
        let probabilities = test_samples
            .iter()
            .map(|s| model.predict_proba(s))
            .collect::<Result<Vec<f64>>>()?;
        let predictions: Vec<u8> = model
            .predict_batch(&test_samples)
            .iter()
            .map(|p| p.class())
            .collect();

        let auc = roc_auc_score(test.labels(), &probabilities)?;
        let metrics = EvaluationMetrics::from_predictions(test.labels(), &predictions)?;
        info!(
            "Test partition: AUC {:.4}, accuracy {:.4}, {} support vectors",
            auc,
            metrics.accuracy(),
            model.n_support_vectors()
        );

        Ok(PipelineReport {
            best_kernel: search.best_kernel,
            best_cv_auc: search.best_score,
            cv_scores: search.candidates,
            cleaning,
            train_size: train.len(),
            test_size: test.len(),
            auc,
            f1: metrics.f1_score(),
            precision: metrics.precision(),
            recall: metrics.recall(),
            balanced_accuracy: metrics.balanced_accuracy(),
            confusion: metrics,
            report: metrics.report(),
            generated_at: Utc::now(),
        })
    }
}

/// Outcome of one pipeline run on the held-out partition
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub best_kernel: KernelKind,
    pub best_cv_auc: f64,
    pub cv_scores: Vec<CandidateScore>,
    pub cleaning: CleaningSummary,
    pub train_size: usize,
    pub test_size: usize,
    /// ROC-AUC of the calibrated probabilities
    pub auc: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub balanced_accuracy: f64,
    pub confusion: EvaluationMetrics,
    pub report: ClassificationReport,
    pub generated_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best Kernel: {}", self.best_kernel)?;
        writeln!(f)?;
        writeln!(f, "Model Performance Metrics:")?;
        writeln!(f, "AUC Score: {}", self.auc)?;
        writeln!(f, "F1 Score: {}", self.f1)?;
        writeln!(f, "Precision: {}", self.precision)?;
        writeln!(f, "Recall: {}", self.recall)?;
        writeln!(f, "Balanced Accuracy: {}", self.balanced_accuracy)?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{}", self.report)
    }
}
