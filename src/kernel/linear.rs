//! Linear kernel implementation

use crate::core::SvmNode;
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two index-sorted node slices
///
/// Merges both slices in O(len(x) + len(y)); indices present in only one
/// side contribute nothing.
pub fn dot(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        let x_idx = x[i].index;
        let y_idx = y[j].index;

        if x_idx == y_idx {
            result += x[i].value * y[j].value;
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}
