//! Kernel families searched by the grid search and their construction

use crate::core::{PipelineError, Result, Sample};
use crate::kernel::{Kernel, LinearKernel, PolynomialKernel, RBFKernel, SigmoidKernel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kernel family of an SVM candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Rbf,
    Poly,
    Sigmoid,
}

impl KernelKind {
    /// Every kernel family, in search order
    pub const ALL: [KernelKind; 4] = [
        KernelKind::Linear,
        KernelKind::Rbf,
        KernelKind::Poly,
        KernelKind::Sigmoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KernelKind::Linear => "linear",
            KernelKind::Rbf => "rbf",
            KernelKind::Poly => "poly",
            KernelKind::Sigmoid => "sigmoid",
        }
    }

    /// Build a concrete kernel with a resolved gamma
    ///
    /// Polynomial kernels use degree 3 and sigmoid/polynomial kernels use
    /// coef0 = 0. Gamma is ignored by the linear kernel.
    pub fn build(&self, gamma: f64) -> SvmKernel {
        match self {
            KernelKind::Linear => SvmKernel::Linear(LinearKernel::new()),
            KernelKind::Rbf => SvmKernel::Rbf(RBFKernel::new(gamma)),
            KernelKind::Poly => SvmKernel::Poly(PolynomialKernel::cubic(gamma)),
            KernelKind::Sigmoid => SvmKernel::Sigmoid(SigmoidKernel::zero_bias(gamma)),
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(KernelKind::Linear),
            "rbf" => Ok(KernelKind::Rbf),
            "poly" | "polynomial" => Ok(KernelKind::Poly),
            "sigmoid" => Ok(KernelKind::Sigmoid),
            other => Err(PipelineError::InvalidParameter(format!(
                "Unknown kernel: {other}"
            ))),
        }
    }
}

/// Gamma setting for the non-linear kernels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gamma {
    /// 1 / (n_features * var(X)) over every entry of the training matrix
    #[default]
    Scale,
    /// Fixed value
    Value(f64),
}

impl Gamma {
    /// Resolve against the samples a model is about to be trained on
    pub fn resolve(&self, samples: &[Sample]) -> f64 {
        match *self {
            Gamma::Value(gamma) => gamma,
            Gamma::Scale => {
                let n_features = samples.first().map(|s| s.dim()).unwrap_or(0);
                let count = (samples.len() * n_features) as f64;
                if count == 0.0 {
                    return 1.0;
                }

                let mean = samples
                    .iter()
                    .flat_map(|s| s.features.iter())
                    .sum::<f64>()
                    / count;
                let variance = samples
                    .iter()
                    .flat_map(|s| s.features.iter())
                    .map(|&x| (x - mean).powi(2))
                    .sum::<f64>()
                    / count;

                if variance > 0.0 {
                    1.0 / (n_features as f64 * variance)
                } else {
                    1.0
                }
            }
        }
    }
}

/// Kernel with its family chosen at runtime
#[derive(Debug, Clone)]
pub enum SvmKernel {
    Linear(LinearKernel),
    Rbf(RBFKernel),
    Poly(PolynomialKernel),
    Sigmoid(SigmoidKernel),
}

impl SvmKernel {
    pub fn kind(&self) -> KernelKind {
        match self {
            SvmKernel::Linear(_) => KernelKind::Linear,
            SvmKernel::Rbf(_) => KernelKind::Rbf,
            SvmKernel::Poly(_) => KernelKind::Poly,
            SvmKernel::Sigmoid(_) => KernelKind::Sigmoid,
        }
    }
}

impl Kernel for SvmKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            SvmKernel::Linear(k) => k.compute(x, y),
            SvmKernel::Rbf(k) => k.compute(x, y),
            SvmKernel::Poly(k) => k.compute(x, y),
            SvmKernel::Sigmoid(k) => k.compute(x, y),
        }
    }

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_kind_parsing() {
        assert_eq!("linear".parse::<KernelKind>().unwrap(), KernelKind::Linear);
        assert_eq!(" RBF ".parse::<KernelKind>().unwrap(), KernelKind::Rbf);
        assert_eq!("polynomial".parse::<KernelKind>().unwrap(), KernelKind::Poly);
        assert_eq!("sigmoid".parse::<KernelKind>().unwrap(), KernelKind::Sigmoid);
        assert!(matches!(
            "laplacian".parse::<KernelKind>(),
            Err(PipelineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_kernel_kind_display_round_trip() {
        for kind in KernelKind::ALL {
            assert_eq!(kind.to_string().parse::<KernelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kernel_kind_serde_names() {
        let json = serde_json::to_string(&KernelKind::ALL).unwrap();
        assert_eq!(json, r#"["linear","rbf","poly","sigmoid"]"#);
    }

    #[test]
    fn test_build_dispatches_to_family() {
        for kind in KernelKind::ALL {
            let kernel = kind.build(0.5);
            assert_eq!(kernel.kind(), kind);
            assert_eq!(kernel.name(), kind.as_str());
        }

        let rbf = KernelKind::Rbf.build(0.5);
        assert_relative_eq!(
            rbf.compute(&[1.0, 0.0], &[0.0, 1.0]),
            (-1.0f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gamma_scale() {
        // Entries 0, 2, 4, 6: mean 3, population variance 5, two features
        let samples = vec![
            Sample::new(vec![0.0, 2.0], 1.0),
            Sample::new(vec![4.0, 6.0], -1.0),
        ];
        assert_relative_eq!(Gamma::Scale.resolve(&samples), 1.0 / 10.0, epsilon = 1e-12);
        assert_eq!(Gamma::Value(0.3).resolve(&samples), 0.3);
    }

    #[test]
    fn test_gamma_scale_constant_data() {
        let samples = vec![
            Sample::new(vec![1.0, 1.0], 1.0),
            Sample::new(vec![1.0, 1.0], -1.0),
        ];
        assert_eq!(Gamma::Scale.resolve(&samples), 1.0);
        assert_eq!(Gamma::Scale.resolve(&[]), 1.0);
    }
}
