//! Polynomial Kernel Implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! The degree is an integer power computed by repeated squaring, so
//! negative bases are valid. A negative degree yields 1.0; the solver's
//! parameter check rejects it before training.

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::traits::Kernel;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone)]
pub struct PolynomialKernel {
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
    /// Degree of the polynomial
    pub degree: i32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel with the specified parameters
    ///
    /// # Examples
    /// ```
    /// use svm_registry::kernel::PolynomialKernel;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let quad_kernel = PolynomialKernel::new(2, 1.0, 1.0);
    /// assert_eq!(quad_kernel.degree, 2);
    /// ```
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        powi(self.gamma * dot(x, y) + self.coef0, self.degree)
    }
}

/// Integer power by squaring; non-positive exponents give 1.0
pub fn powi(base: f64, times: i32) -> f64 {
    let mut tmp = base;
    let mut ret = 1.0;
    let mut t = times;
    while t > 0 {
        if t % 2 == 1 {
            ret *= tmp;
        }
        tmp *= tmp;
        t /= 2;
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_powi() {
        assert_eq!(powi(2.0, 10), 1024.0);
        assert_eq!(powi(-3.0, 3), -27.0);
        assert_eq!(powi(5.0, 0), 1.0);
        assert_eq!(powi(5.0, -2), 1.0);
    }

    #[test]
    fn test_polynomial_kernel_value() {
        let kernel = PolynomialKernel::new(3, 0.5, 1.0);
        let x = [SvmNode::new(1, 1.0), SvmNode::new(2, 2.0)];
        let y = [SvmNode::new(1, 2.0), SvmNode::new(2, 1.0)];

        // (0.5 * 4 + 1)^3 = 27
        assert_relative_eq!(kernel.compute(&x, &y), 27.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_inner_term_keeps_sign() {
        let kernel = PolynomialKernel::new(3, 1.0, 0.0);
        let x = [SvmNode::new(1, -1.0)];
        let y = [SvmNode::new(1, 2.0)];
        assert_eq!(kernel.compute(&x, &y), -8.0);
    }
}
