//! Host-facing API
//!
//! A [`Session`] is what a host integration calls into. Every operation
//! takes plain numbers, slices and matrices, addresses long-lived instances
//! by `f64` handles, and reports problems as a [`Failure`] naming the
//! operation. Nothing is registered unless the instance was fully built.
//!
//! ```
//! use svm_registry::api::Session;
//! use svm_registry::core::Matrix;
//!
//! let mut session = Session::default();
//! let x = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let problem = session.problem_create(&[1.0, -1.0], &x).unwrap();
//! let parameter = session.parameter_create(Default::default()).unwrap();
//! let model = session.model_create(problem, parameter).unwrap();
//!
//! let summary = session.model_query(model).unwrap();
//! assert_eq!(summary.number(1, 2), Some(2.0));
//! ```

use crate::core::{Grid, KernelType, Kind, Matrix, Result, SVMError, Solver, SvmType};
use crate::model::Model;
use crate::parameter::{Parameter, SvmParameter};
use crate::persistence;
use crate::problem::Problem;
use crate::registry::{Handle, HandleRegistry, Registered};
use crate::solver::LibSvm;
use lazy_static::lazy_static;
use log::{debug, error};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Failed host operation with a printable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation}: {message}")]
pub struct Failure {
    operation: &'static str,
    message: String,
}

impl Failure {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type ApiResult<T> = std::result::Result<T, Failure>;

fn guard<T>(operation: &'static str, result: Result<T>) -> ApiResult<T> {
    result.map_err(|e| {
        let failure = Failure {
            operation,
            message: e.to_string(),
        };
        error!("{failure}");
        failure
    })
}

/// Host arguments for a parameter
///
/// Enums arrive as libsvm integer codes. Fields not listed here (weights,
/// nu, p, shrinking, probability) keep their defaults; use
/// [`Session::parameter_create_full`] to set them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterArgs {
    pub svm_type: i32,
    pub kernel_type: i32,
    pub degree: i32,
    pub gamma: f64,
    pub coef0: f64,
    pub cache_size: f64,
    pub eps: f64,
    pub c: f64,
    pub nr_weight: i32,
}

impl Default for ParameterArgs {
    fn default() -> Self {
        let defaults = SvmParameter::default();
        Self {
            svm_type: defaults.svm_type.code(),
            kernel_type: defaults.kernel_type.code(),
            degree: defaults.degree,
            gamma: defaults.gamma,
            coef0: defaults.coef0,
            cache_size: defaults.cache_size,
            eps: defaults.eps,
            c: defaults.c,
            nr_weight: defaults.nr_weight,
        }
    }
}

impl ParameterArgs {
    fn into_config(self) -> Result<SvmParameter> {
        Ok(SvmParameter {
            svm_type: SvmType::try_from(self.svm_type)?,
            kernel_type: KernelType::try_from(self.kernel_type)?,
            degree: self.degree,
            gamma: self.gamma,
            coef0: self.coef0,
            cache_size: self.cache_size,
            eps: self.eps,
            c: self.c,
            nr_weight: self.nr_weight,
            ..SvmParameter::default()
        })
    }
}

/// Registry of host-visible instances plus the solver that trains models
pub struct Session {
    registry: HandleRegistry,
    solver: Arc<dyn Solver>,
    caller: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(LibSvm::new()))
    }
}

impl Session {
    pub fn new(solver: Arc<dyn Solver>) -> Self {
        Self {
            registry: HandleRegistry::new(),
            solver,
            caller: None,
        }
    }

    /// Set the host context that owns instances created from now on
    ///
    /// A context holds at most one handle: creating again from the same
    /// context releases what it created before.
    pub fn set_caller(&mut self, caller: Option<&str>) {
        self.caller = caller.map(str::to_string);
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn resolve<T: Registered>(&self, handle: f64) -> Result<&T> {
        let handle = Handle::from_f64(handle).ok_or(SVMError::InvalidHandle { kind: T::KIND })?;
        self.registry.resolve(handle)
    }

    fn register<T: Registered>(&mut self, value: T) -> Result<f64> {
        let handle = self
            .registry
            .register_for(self.caller.as_deref(), value)?;
        Ok(handle.to_f64())
    }

    /// Version of the solver library
    pub fn version(&self) -> i32 {
        self.solver.version()
    }

    /// Create a problem from `y` labels and the rows of `x`
    pub fn problem_create(&mut self, y: &[f64], x: &Matrix) -> ApiResult<f64> {
        let result = if y.len() != x.rows() {
            Err(SVMError::DimensionMismatch {
                expected: x.rows(),
                actual: y.len(),
            })
        } else {
            Problem::from_matrix(y, x).and_then(|problem| self.register(problem))
        };
        guard("problem_create", result)
    }

    /// Stored labels and features with a feature-index header
    pub fn problem_query(&self, handle: f64) -> ApiResult<Grid> {
        guard(
            "problem_query",
            self.resolve::<Problem>(handle).map(Problem::query),
        )
    }

    pub fn parameter_create(&mut self, args: ParameterArgs) -> ApiResult<f64> {
        let result = args
            .into_config()
            .and_then(|config| self.register(Parameter::new(config)));
        guard("parameter_create", result)
    }

    /// Create a parameter with every field supplied
    pub fn parameter_create_full(&mut self, config: SvmParameter) -> ApiResult<f64> {
        let result = self.register(Parameter::new(config));
        guard("parameter_create_full", result)
    }

    /// Every parameter field, keys on the first row and values on the second
    pub fn parameter_query(&self, handle: f64) -> ApiResult<Grid> {
        let result = self
            .resolve::<Parameter>(handle)
            .map(|parameter| Grid::from_record(&parameter.query()));
        guard("parameter_query", result)
    }

    /// Train a model on a problem with a parameter
    ///
    /// The solver's parameter check runs first; its message is reported
    /// unchanged and no model is registered.
    pub fn model_create(&mut self, problem: f64, parameter: f64) -> ApiResult<f64> {
        let trained = self.resolve::<Problem>(problem).and_then(|problem| {
            let parameter = self.resolve::<Parameter>(parameter)?;
            Model::train(problem, parameter, Arc::clone(&self.solver))
        });
        let result = trained.and_then(|model| self.register(model));
        guard("model_create", result)
    }

    /// `svm_type`, `kernel_type`, `nr_class` and `nr_sv` as a key-value grid
    pub fn model_query(&self, handle: f64) -> ApiResult<Grid> {
        let result = self
            .resolve::<Model>(handle)
            .map(|model| Grid::from_record(&model.summary().query()));
        guard("model_query", result)
    }

    pub fn model_support_vectors(&self, handle: f64) -> ApiResult<Grid> {
        guard(
            "model_support_vectors",
            self.resolve::<Model>(handle).map(Model::support_vectors),
        )
    }

    /// One prediction per row of `x`
    pub fn model_predict(&self, handle: f64, x: &Matrix) -> ApiResult<Vec<f64>> {
        let result = self
            .resolve::<Model>(handle)
            .map(|model| (0..x.rows()).map(|i| model.predict(x.row(i))).collect());
        guard("model_predict", result)
    }

    pub fn model_save(&self, handle: f64, path: &Path) -> ApiResult<()> {
        let result = self
            .resolve::<Model>(handle)
            .and_then(|model| persistence::save_model(model, path));
        guard("model_save", result)
    }

    pub fn model_load(&mut self, path: &Path) -> ApiResult<f64> {
        let result = persistence::load_model(path, Arc::clone(&self.solver))
            .and_then(|model| self.register(model));
        guard("model_load", result)
    }

    /// Destroy the instance behind a handle of any kind
    pub fn release(&mut self, handle: f64) -> ApiResult<()> {
        let result = Handle::from_f64(handle)
            .ok_or(SVMError::UnknownHandle)
            .and_then(|handle| self.registry.release(handle));
        guard("release", result)
    }

    /// Kind of the live instance behind a handle
    pub fn kind_of(&self, handle: f64) -> Option<Kind> {
        Handle::from_f64(handle).and_then(|handle| self.registry.kind_of(handle))
    }

    /// Host unload: release every instance
    pub fn unload(&mut self) {
        debug!("Unloading session with {} live handles", self.registry.len());
        self.registry.clear();
    }

    pub fn live_handles(&self) -> Vec<f64> {
        self.registry
            .handles()
            .into_iter()
            .map(Handle::to_f64)
            .collect()
    }
}

lazy_static! {
    static ref SESSION: Mutex<Session> = Mutex::new(Session::default());
}

/// Run `f` against the process-wide session
///
/// Calls are serialized. A panic in an earlier call does not lock the
/// session out, since every operation leaves the registry consistent.
pub fn with_session<R>(f: impl FnOnce(&mut Session) -> R) -> R {
    let mut session = SESSION.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut session)
}
