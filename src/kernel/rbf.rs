//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// A gamma of zero is resolved to `1 / columns` by the solver before the
/// kernel is built.
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }

    fn compute_with_norms(
        &self,
        x: &[SvmNode],
        y: &[SvmNode],
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        // ||x - y||² = ||x||² + ||y||² - 2*x^T*y
        let squared_distance = (x_norm_sq + y_norm_sq - 2.0 * dot(x, y)).max(0.0);
        (-self.gamma * squared_distance).exp()
    }
}

/// Squared Euclidean distance between two index-sorted node slices
///
/// Indices present in only one slice count against an implicit zero.
fn squared_distance(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        if x[i].index == y[j].index {
            let diff = x[i].value - y[j].value;
            distance_sq += diff * diff;
            i += 1;
            j += 1;
        } else if x[i].index < y[j].index {
            distance_sq += x[i].value * x[i].value;
            i += 1;
        } else {
            distance_sq += y[j].value * y[j].value;
            j += 1;
        }
    }

    distance_sq += x[i..].iter().map(|n| n.value * n.value).sum::<f64>();
    distance_sq += y[j..].iter().map(|n| n.value * n.value).sum::<f64>();

    distance_sq
}
