//! Trained models
//!
//! A [`Model`] owns one trained result and the solver that produced it.
//! Creation runs the solver's parameter check before training, so a model
//! only exists for a problem/parameter pair the solver accepted.
//!
//! Dropping a model releases its result through [`Solver::destroy`] when the
//! result owns its support-vector storage. Results that borrow storage from
//! their training problem are dropped without calling the solver.

use crate::core::{dense_to_nodes, Grid, KernelType, Result, SVMError, Solver, SvmType};
use crate::parameter::Parameter;
use crate::problem::Problem;
use crate::solver::{Ownership, TrainedModel};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Read-only projection of a trained model's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSummary {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    pub nr_class: usize,
    pub nr_sv: usize,
}

impl ModelSummary {
    /// Flat key-value record, enums as their integer codes
    pub fn query(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("svm_type", f64::from(self.svm_type.code())),
            ("kernel_type", f64::from(self.kernel_type.code())),
            ("nr_class", self.nr_class as f64),
            ("nr_sv", self.nr_sv as f64),
        ]
    }
}

pub struct Model {
    svm_type: SvmType,
    kernel_type: KernelType,
    trained: TrainedModel,
    solver: Arc<dyn Solver>,
}

impl Model {
    /// Check the pair with the solver, then train
    ///
    /// A failed check is returned as [`SVMError::ParameterValidation`]
    /// carrying the solver's message unchanged, and nothing is trained.
    pub fn train(
        problem: &Problem,
        parameter: &Parameter,
        solver: Arc<dyn Solver>,
    ) -> Result<Self> {
        let config = parameter.config();
        solver
            .check_parameter(problem, config)
            .map_err(SVMError::ParameterValidation)?;

        let trained = solver.train(problem, config)?;
        debug!(
            "Trained model: {} classes, {} support vectors",
            trained.nr_class,
            trained.sv_count()
        );
        Ok(Self::from_trained(trained, solver))
    }

    /// Take ownership of an already trained result
    pub fn from_trained(trained: TrainedModel, solver: Arc<dyn Solver>) -> Self {
        Self {
            svm_type: trained.param.svm_type,
            kernel_type: trained.param.kernel_type,
            trained,
            solver,
        }
    }

    pub fn svm_type(&self) -> SvmType {
        self.svm_type
    }

    pub fn kernel_type(&self) -> KernelType {
        self.kernel_type
    }

    pub fn trained(&self) -> &TrainedModel {
        &self.trained
    }

    pub fn ownership(&self) -> Ownership {
        self.trained.ownership()
    }

    /// Solver that trained (or adopted) this model
    pub fn solver(&self) -> &Arc<dyn Solver> {
        &self.solver
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            svm_type: self.svm_type,
            kernel_type: self.kernel_type,
            nr_class: self.trained.nr_class,
            nr_sv: self.trained.sv_count(),
        }
    }

    /// Support vectors and their coefficients as a table
    ///
    /// The header row holds `0`, the feature indices `1..=c` and one
    /// coefficient label per decision row (`alpha`, or `alpha1..` when
    /// there are several). Each following row holds the support vector's
    /// 1-based training row, its values and its coefficients.
    pub fn support_vectors(&self) -> Grid {
        let trained = &self.trained;
        let svs = &trained.support_vectors;
        let columns = svs.iter().map(<[_]>::len).max().unwrap_or(0);
        let coef_rows = trained.sv_coef.len();

        let mut grid = Grid::new(svs.len() + 1, 1 + columns + coef_rows);
        grid.set(0, 0, 0.0);
        for j in 1..=columns {
            grid.set(0, j, j as f64);
        }
        for k in 0..coef_rows {
            let label = if coef_rows == 1 {
                "alpha".to_string()
            } else {
                format!("alpha{}", k + 1)
            };
            grid.set(0, 1 + columns + k, label.as_str());
        }

        for (i, sv) in svs.iter().enumerate() {
            let index = trained.sv_indices.get(i).copied().unwrap_or(0);
            grid.set(i + 1, 0, index as f64);
            for (j, node) in sv.iter().enumerate() {
                grid.set(i + 1, j + 1, node.value);
            }
            for (k, coef) in trained.sv_coef.iter().enumerate() {
                if let Some(&value) = coef.get(i) {
                    grid.set(i + 1, 1 + columns + k, value);
                }
            }
        }
        grid
    }

    /// Predicted label, ±1 or regression value for one dense feature row
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.trained.predict(&dense_to_nodes(features))
    }

    /// Decision values for one dense feature row
    pub fn decision_values(&self, features: &[f64]) -> Vec<f64> {
        self.trained.predict_values(&dense_to_nodes(features)).1
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("svm_type", &self.svm_type)
            .field("kernel_type", &self.kernel_type)
            .field("nr_class", &self.trained.nr_class)
            .field("nr_sv", &self.trained.sv_count())
            .field("ownership", &self.ownership())
            .finish()
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        let trained = std::mem::take(&mut self.trained);
        match trained.ownership() {
            Ownership::Owned => self.solver.destroy(trained),
            Ownership::Borrowed => debug!("Dropping model with borrowed support vectors"),
        }
    }
}
