//! Handle-based Support Vector Machine training and inference
//!
//! Hosts create problems, parameters and models through [`api::Session`]
//! and refer to them by numeric handles that are checked on every use.
//! Training and prediction run on the bundled libsvm-style solver.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod model;
pub mod parameter;
pub mod persistence;
pub mod problem;
pub mod registry;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{with_session, ApiResult, Failure, ParameterArgs, Session};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::{CSVDataset, Dataset, LibSVMDataset};
pub use crate::kernel::Kernel;
pub use crate::model::{Model, ModelSummary};
pub use crate::parameter::{Parameter, ParameterBuilder, SvmParameter};
pub use crate::problem::Problem;
pub use crate::registry::{Handle, HandleRegistry};
pub use crate::solver::{LibSvm, Ownership, TrainedModel};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
