//! Cervical cancer biopsy classification with a kernel SVM
//!
//! Cleans the risk-factor table, selects the clinical features, imputes,
//! splits, standardizes, picks the kernel by cross-validated ROC-AUC with
//! an SMO-trained SVM and reports held-out metrics.

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod data;
pub mod kernel;
pub mod metrics;
pub mod optimizer;
pub mod selection;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{Pipeline, PipelineReport};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::config::{PipelineConfig, DEFAULT_FEATURES};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{PipelineError, Result};
pub use crate::data::{CleaningSummary, LabeledData, RawTable};
pub use crate::kernel::{Gamma, Kernel, KernelKind, SvmKernel};
pub use crate::metrics::{roc_auc_score, ClassificationReport, EvaluationMetrics};
pub use crate::optimizer::{PlattScaling, SVMOptimizer, TrainedSVM};
pub use crate::selection::{GridSearch, StratifiedKFold};
