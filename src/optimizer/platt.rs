//! Platt scaling: a sigmoid mapping SVM decision values to probabilities
//!
//! P(y = +1 | f) = 1 / (1 + exp(A * f + B)), fitted by Newton's method
//! with a backtracking line search on the regularized log-likelihood
//! (Lin, Lin & Weng, "A note on Platt's probabilistic outputs").

use crate::core::{PipelineError, Result};
use log::warn;
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 100;
const MIN_STEP: f64 = 1e-10;
const SIGMA: f64 = 1e-12;
const GRADIENT_EPS: f64 = 1e-5;

/// Fitted sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    /// Fit on decision values and their true labels in {-1, +1}
    pub fn fit(decision_values: &[f64], labels: &[f64]) -> Result<Self> {
        if decision_values.len() != labels.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: labels.len(),
                actual: decision_values.len(),
            });
        }
        if decision_values.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no decision values to calibrate".to_string(),
            ));
        }

        let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
        let prior0 = labels.len() as f64 - prior1;

        // Smoothed targets instead of hard 0/1
        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.0 { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(decision_values, &targets, a, b);

        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let mut h11 = SIGMA;
            let mut h22 = SIGMA;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;

            for (&f, &t) in decision_values.iter().zip(&targets) {
                let f_apb = f * a + b;
                let (p, q) = if f_apb >= 0.0 {
                    let e = (-f_apb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_apb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < GRADIENT_EPS && g2.abs() < GRADIENT_EPS {
                converged = true;
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let d_a = -(h22 * g1 - h21 * g2) / det;
            let d_b = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * d_a + g2 * d_b;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * d_a;
                let new_b = b + step * d_b;
                let new_f = objective(decision_values, &targets, new_a, new_b);
                if new_f < fval + 0.0001 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < MIN_STEP {
                warn!("Platt scaling line search failed; keeping current sigmoid");
                converged = true;
                break;
            }
        }

        if !converged {
            warn!("Platt scaling reached {MAX_ITERATIONS} iterations without converging");
        }

        Ok(Self { a, b })
    }

    /// Probability of the positive class for a decision value
    pub fn probability(&self, decision_value: f64) -> f64 {
        let f_apb = decision_value * self.a + self.b;
        if f_apb >= 0.0 {
            let e = (-f_apb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_apb.exp())
        }
    }
}

/// Negative log-likelihood, written to avoid overflow in exp
fn objective(decision_values: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    decision_values
        .iter()
        .zip(targets)
        .map(|(&f, &t)| {
            let f_apb = f * a + b;
            if f_apb >= 0.0 {
                t * f_apb + (1.0 + (-f_apb).exp()).ln()
            } else {
                (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
            }
        })
        .sum()
}
