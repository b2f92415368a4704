//! Core type definitions shared by the solver, the model and the pipeline

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Distance from the decision boundary
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }

    /// Binary class in the dataset's 0/1 encoding
    pub fn class(&self) -> u8 {
        if self.label > 0.0 {
            1
        } else {
            0
        }
    }
}

/// Training sample: a dense feature row and a label in {-1, +1}
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub label: f64,
}

impl Sample {
    pub fn new(features: Vec<f64>, label: f64) -> Self {
        Self { features, label }
    }

    /// Build a sample from a 0/1 class, mapping 1 to +1 and 0 to -1
    pub fn from_class(features: Vec<f64>, class: u8) -> Self {
        let label = if class == 1 { 1.0 } else { -1.0 };
        Self::new(features, label)
    }

    pub fn dim(&self) -> usize {
        self.features.len()
    }
}

/// Result of the SMO optimization
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b)
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of passes over the training set
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
}

/// Configuration for the SMO solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance for KKT conditions
    pub epsilon: f64,
    /// Maximum number of passes over the training set
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 10_000,
            cache_size: 100_000_000, // 100MB
        }
    }
}
