//! SVM solver implementations
//!
//! [`LibSvm`] is the bundled [`Solver`]: a libsvm-compatible SMO solver
//! with second-order working-set selection and shrinking. It covers
//! C-SVC, nu-SVC, one-class, epsilon-SVR and nu-SVR over the linear,
//! polynomial, RBF, sigmoid and precomputed kernels.

pub mod qmatrix;
pub mod shrinking;
pub mod smo;
pub mod train;
pub mod trained;

pub use self::smo::{SMOSolver, SmoConfig, SolutionInfo, SolverVariant};
pub use self::trained::{Ownership, SupportVectors, TrainedModel};

use crate::core::{Result, Solver};
use crate::parameter::SvmParameter;
use crate::problem::Problem;
use log::debug;

/// libsvm release the bundled solver follows
pub const LIBSVM_VERSION: i32 = 336;

/// Bundled SMO solver
#[derive(Debug, Clone, Copy, Default)]
pub struct LibSvm;

impl LibSvm {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for LibSvm {
    fn version(&self) -> i32 {
        LIBSVM_VERSION
    }

    fn check_parameter(
        &self,
        problem: &Problem,
        param: &SvmParameter,
    ) -> std::result::Result<(), String> {
        train::check_parameter(problem, param)
    }

    fn train(&self, problem: &Problem, param: &SvmParameter) -> Result<TrainedModel> {
        train::train(problem, param)
    }

    fn destroy(&self, model: TrainedModel) {
        debug!(
            "Released trained model with {} support vectors",
            model.sv_count()
        );
        drop(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(LibSvm::new().version(), 336);
    }

    #[test]
    fn test_check_then_train() {
        let problem = Problem::new(2, &[1.0, -1.0], 1, &[1.0, -1.0]).unwrap();
        let solver = LibSvm::new();
        let param = SvmParameter::default();

        assert!(solver.check_parameter(&problem, &param).is_ok());
        let model = solver.train(&problem, &param).unwrap();
        assert_eq!(model.predict(problem.row(0)), 1.0);
        assert_eq!(model.predict(problem.row(1)), -1.0);
    }
}
