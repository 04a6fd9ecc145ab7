//! Kernel trait definition

use crate::core::{KernelType, SvmNode};
use crate::kernel::{LinearKernel, PolynomialKernel, PrecomputedKernel, RBFKernel, SigmoidKernel};
use crate::parameter::SvmParameter;

/// Kernel function trait
///
/// Rows are node slices sorted by index, as stored by
/// [`Problem`](crate::problem::Problem).
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64;

    /// Optional: compute K(x, y) from precomputed squared norms
    ///
    /// Only kernels depending on the distance between rows (RBF) benefit.
    fn compute_with_norms(
        &self,
        x: &[SvmNode],
        y: &[SvmNode],
        _x_norm_sq: f64,
        _y_norm_sq: f64,
    ) -> f64 {
        self.compute(x, y)
    }
}

/// Build the kernel selected by a parameter record
pub fn kernel_for(param: &SvmParameter) -> Box<dyn Kernel> {
    match param.kernel_type {
        KernelType::Linear => Box::new(LinearKernel::new()),
        KernelType::Polynomial => Box::new(PolynomialKernel::new(
            param.degree,
            param.gamma,
            param.coef0,
        )),
        KernelType::Rbf => Box::new(RBFKernel::new(param.gamma)),
        KernelType::Sigmoid => Box::new(SigmoidKernel::new(param.gamma, param.coef0)),
        KernelType::Precomputed => Box::new(PrecomputedKernel::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dense_to_nodes;
    use approx::assert_relative_eq;

    #[test]
    fn test_norms_ignored_by_default() {
        let x = dense_to_nodes(&[1.0, 2.0]);
        let y = dense_to_nodes(&[3.0, 4.0]);
        let linear = LinearKernel::new();

        // Deliberately wrong norms leave the plain dot product unchanged
        assert_eq!(linear.compute_with_norms(&x, &y, -1.0, 1e9), 11.0);
    }

    #[test]
    fn test_kernel_for_matches_parameter() {
        let x = dense_to_nodes(&[1.0, 2.0]);
        let y = dense_to_nodes(&[3.0, 4.0]);

        let linear = SvmParameter {
            kernel_type: KernelType::Linear,
            ..Default::default()
        };
        assert_eq!(kernel_for(&linear).compute(&x, &y), 11.0);

        let poly = SvmParameter {
            kernel_type: KernelType::Polynomial,
            degree: 2,
            gamma: 1.0,
            coef0: 1.0,
            ..Default::default()
        };
        assert_eq!(kernel_for(&poly).compute(&x, &y), 144.0);

        let rbf = SvmParameter {
            gamma: 0.5,
            ..Default::default()
        };
        assert_relative_eq!(
            kernel_for(&rbf).compute(&x, &y),
            (-4.0f64).exp(),
            epsilon = 1e-12
        );

        let sigmoid = SvmParameter {
            kernel_type: KernelType::Sigmoid,
            gamma: 0.1,
            coef0: -1.0,
            ..Default::default()
        };
        assert_relative_eq!(
            kernel_for(&sigmoid).compute(&x, &y),
            (0.1f64).tanh(),
            epsilon = 1e-12
        );
    }
}
