//! Kernel trait definition

/// Kernel function trait
///
/// A kernel K(x, y) maps two dense feature rows of equal length to a
/// similarity value. Kernels satisfying Mercer's condition give a convex
/// dual problem; the sigmoid kernel does not always, and the solver
/// accounts for that.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;
}
