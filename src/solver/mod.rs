//! SVM solver implementations
//!
//! This module implements the Sequential Minimal Optimization (SMO)
//! algorithm for the soft-margin SVM dual.

pub mod smo;

pub use self::smo::*;
