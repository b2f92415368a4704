//! Pipeline configuration
//!
//! Every constant of the pipeline lives here. Fields missing from a JSON
//! file fall back to their defaults.

use crate::core::{PipelineError, Result, SolverConfig};
use crate::data::DEFAULT_MISSING_MARKERS;
use crate::kernel::KernelKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Feature columns used for classification, after name normalization
pub const DEFAULT_FEATURES: [&str; 9] = [
    "age",
    "stds:_number_of_diagnosis",
    "dx:cancer",
    "dx:cin",
    "dx:hpv",
    "dx",
    "hinselmann",
    "schiller",
    "citology",
];

pub const DEFAULT_LABEL: &str = "biopsy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: Vec<String>,
    pub label: String,
    pub missing_markers: Vec<String>,
    pub test_size: f64,
    pub seed: u64,
    pub cv_folds: usize,
    pub kernels: Vec<KernelKind>,
    pub c: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Kernel cache budget in bytes
    pub cache_size: usize,
    pub probability_folds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            label: DEFAULT_LABEL.to_string(),
            missing_markers: DEFAULT_MISSING_MARKERS.iter().map(|m| m.to_string()).collect(),
            test_size: 0.3,
            seed: 42,
            cv_folds: 5,
            kernels: KernelKind::ALL.to_vec(),
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 10_000,
            cache_size: 100_000_000,
            probability_folds: 5,
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(invalid("at least one feature column is required"));
        }
        if self.label.is_empty() {
            return Err(invalid("label column name is empty"));
        }
        if self.features.contains(&self.label) {
            return Err(invalid(format!(
                "label column '{}' is also listed as a feature",
                self.label
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(invalid(format!(
                "test_size must be in (0, 1), got: {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(invalid(format!(
                "cv_folds must be at least 2, got: {}",
                self.cv_folds
            )));
        }
        if self.kernels.is_empty() {
            return Err(invalid("at least one kernel is required"));
        }
        if self.c <= 0.0 || !self.c.is_finite() {
            return Err(invalid(format!("C must be positive, got: {}", self.c)));
        }
        if !(self.epsilon > 0.0) {
            return Err(invalid(format!(
                "epsilon must be positive, got: {}",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be positive"));
        }
        Ok(())
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            c: self.c,
            epsilon: self.epsilon,
            max_iterations: self.max_iterations,
            cache_size: self.cache_size,
        }
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidParameter(message.into())
}
