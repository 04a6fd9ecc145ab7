//! Core traits for the SVM handle layer

use crate::core::Result;
use crate::parameter::SvmParameter;
use crate::problem::Problem;
use crate::solver::TrainedModel;

/// Numerical solver consumed by [`Model`](crate::model::Model)
///
/// The solver validates a problem/parameter pair, trains a result and
/// releases results it owns. Implementations may share storage with the
/// problem they were trained on; such results report
/// [`Ownership::Borrowed`](crate::solver::Ownership) and are never passed
/// to [`Solver::destroy`].
pub trait Solver: Send + Sync {
    /// Integer version of the solver library
    fn version(&self) -> i32;

    /// Structural check of a problem and parameter pair
    ///
    /// Returns the solver's own message text on failure.
    fn check_parameter(
        &self,
        problem: &Problem,
        param: &SvmParameter,
    ) -> std::result::Result<(), String>;

    /// Train a result; only called after `check_parameter` succeeded
    fn train(&self, problem: &Problem, param: &SvmParameter) -> Result<TrainedModel>;

    /// Release a result whose support-vector storage is owned
    fn destroy(&self, model: TrainedModel);
}
