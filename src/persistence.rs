//! Model serialization and persistence
//!
//! Trained models are stored as JSON. A loaded model owns its support
//! vectors, so it is released through its solver like any other owned
//! result. Loading checks that the stored arrays agree with each other
//! before anything is handed to prediction.

use crate::core::{Result, SVMError, Solver, SvmNode, SvmType};
use crate::model::Model;
use crate::parameter::SvmParameter;
use crate::solver::{SupportVectors, TrainedModel};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// Serializable representation of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    /// Training parameters, gamma resolved
    pub param: SvmParameter,
    pub nr_class: usize,
    pub support_vectors: Vec<SerializableVector>,
    /// `nr_class - 1` coefficient rows
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    pub label: Vec<i32>,
    pub n_sv: Vec<usize>,
    /// 1-based training rows of the support vectors
    pub sv_indices: Vec<usize>,
    pub metadata: ModelMetadata,
}

/// Support vector as parallel index/value arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableVector {
    pub indices: Vec<i32>,
    pub values: Vec<f64>,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Crate version that wrote the file
    pub library_version: String,
    /// Version reported by the training solver
    pub solver_version: i32,
    pub n_support_vectors: usize,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl From<&[SvmNode]> for SerializableVector {
    fn from(nodes: &[SvmNode]) -> Self {
        Self {
            indices: nodes.iter().map(|n| n.index).collect(),
            values: nodes.iter().map(|n| n.value).collect(),
        }
    }
}

impl SerializableVector {
    fn to_nodes(&self) -> Result<Vec<SvmNode>> {
        if self.indices.len() != self.values.len() {
            return Err(SVMError::SerializationError(format!(
                "support vector has {} indices but {} values",
                self.indices.len(),
                self.values.len()
            )));
        }
        Ok(self
            .indices
            .iter()
            .zip(&self.values)
            .map(|(&index, &value)| SvmNode::new(index, value))
            .collect())
    }
}

impl SerializableModel {
    /// Capture a model's trained result
    pub fn from_model(model: &Model) -> Self {
        let trained = model.trained();
        Self {
            param: trained.param.clone(),
            nr_class: trained.nr_class,
            support_vectors: trained
                .support_vectors
                .iter()
                .map(SerializableVector::from)
                .collect(),
            sv_coef: trained.sv_coef.clone(),
            rho: trained.rho.clone(),
            label: trained.label.clone(),
            n_sv: trained.n_sv.clone(),
            sv_indices: trained.sv_indices.clone(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                solver_version: model.solver().version(),
                n_support_vectors: trained.sv_count(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        let model = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(model)
    }

    /// Check that the stored arrays describe one consistent decision function
    pub fn validate(&self) -> Result<()> {
        let l = self.support_vectors.len();
        let invalid = |message: String| Err(SVMError::SerializationError(message));

        if self.sv_indices.len() != l {
            return invalid(format!(
                "{} support vectors but {} support vector indices",
                l,
                self.sv_indices.len()
            ));
        }

        let (coef_rows, rho_len) = match self.param.svm_type {
            SvmType::CSvc | SvmType::NuSvc => {
                let k = self.nr_class;
                if k == 0 {
                    return invalid("classification model without classes".to_string());
                }
                if self.label.len() != k || self.n_sv.len() != k {
                    return invalid(format!(
                        "{k} classes but {} labels and {} class counts",
                        self.label.len(),
                        self.n_sv.len()
                    ));
                }
                if self.n_sv.iter().sum::<usize>() != l {
                    return invalid("class counts do not add up to the support vectors".to_string());
                }
                (k - 1, k * (k - 1) / 2)
            }
            SvmType::OneClass | SvmType::EpsilonSvr | SvmType::NuSvr => (1, 1),
        };

        if self.sv_coef.len() != coef_rows {
            return invalid(format!(
                "expected {coef_rows} coefficient rows, found {}",
                self.sv_coef.len()
            ));
        }
        if let Some(row) = self.sv_coef.iter().find(|row| row.len() != l) {
            return invalid(format!(
                "coefficient row of length {} for {l} support vectors",
                row.len()
            ));
        }
        if self.rho.len() != rho_len {
            return invalid(format!(
                "expected {rho_len} decision offsets, found {}",
                self.rho.len()
            ));
        }
        Ok(())
    }

    /// Rebuild an owned trained result
    pub fn to_trained(&self) -> Result<TrainedModel> {
        self.validate()?;
        let rows = self
            .support_vectors
            .iter()
            .map(SerializableVector::to_nodes)
            .collect::<Result<Vec<_>>>()?;

        Ok(TrainedModel {
            param: self.param.clone(),
            nr_class: self.nr_class,
            support_vectors: SupportVectors::Owned(rows),
            sv_coef: self.sv_coef.clone(),
            rho: self.rho.clone(),
            label: self.label.clone(),
            n_sv: self.n_sv.clone(),
            sv_indices: self.sv_indices.clone(),
        })
    }

    /// Rebuild a model whose result is released through `solver`
    pub fn to_model(&self, solver: Arc<dyn Solver>) -> Result<Model> {
        Ok(Model::from_trained(self.to_trained()?, solver))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== SVM Model Summary ===");
        println!("SVM Type: {:?}", self.param.svm_type);
        println!("Kernel Type: {:?}", self.param.kernel_type);
        println!("Classes: {}", self.nr_class);
        if !self.label.is_empty() {
            println!("Labels: {:?}", self.label);
        }
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!("Library Version: {}", self.metadata.library_version);
        println!("Solver Version: {}", self.metadata.solver_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!("  C: {}", self.param.c);
        println!("  nu: {}", self.param.nu);
        println!("  gamma: {}", self.param.gamma);
        println!("  eps: {}", self.param.eps);
    }
}

/// Save a model's trained result as JSON
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    SerializableModel::from_model(model).save_to_file(path)
}

/// Load a JSON model and adopt it under `solver`
pub fn load_model<P: AsRef<Path>>(path: P, solver: Arc<dyn Solver>) -> Result<Model> {
    SerializableModel::load_from_file(path)?.to_model(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KernelType;
    use crate::parameter::Parameter;
    use crate::problem::Problem;
    use crate::solver::{LibSvm, Ownership};
    use tempfile::NamedTempFile;

    fn trained_model() -> Model {
        let problem = Problem::new(
            4,
            &[1.0, 1.0, -1.0, -1.0],
            2,
            &[2.0, 2.0, 3.0, 1.0, -2.0, -2.0, -3.0, -1.0],
        )
        .unwrap();
        let parameter = Parameter::builder()
            .with_kernel_type(KernelType::Linear)
            .build();
        Model::train(&problem, &parameter, Arc::new(LibSvm)).unwrap()
    }

    #[test]
    fn test_vector_conversion() {
        let nodes = vec![SvmNode::new(1, 0.5), SvmNode::new(3, -1.0)];
        let vector = SerializableVector::from(nodes.as_slice());
        assert_eq!(vector.indices, vec![1, 3]);
        assert_eq!(vector.to_nodes().unwrap(), nodes);

        let ragged = SerializableVector {
            indices: vec![1, 2],
            values: vec![1.0],
        };
        assert!(ragged.to_nodes().is_err());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let model = trained_model();
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        save_model(&model, temp_file.path())?;

        let loaded = load_model(temp_file.path(), Arc::new(LibSvm))?;
        assert_eq!(loaded.summary(), model.summary());
        assert_eq!(loaded.ownership(), Ownership::Owned);
        for x in [[2.5, 1.5], [-2.5, -1.5], [0.5, 0.2]] {
            assert_eq!(loaded.predict(&x), model.predict(&x));
        }
        Ok(())
    }

    #[test]
    fn test_metadata() {
        let stored = SerializableModel::from_model(&trained_model());
        assert_eq!(stored.metadata.solver_version, 336);
        assert_eq!(
            stored.metadata.n_support_vectors,
            stored.support_vectors.len()
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&stored.metadata.created_at).is_ok());
    }

    #[test]
    fn test_inconsistent_file_rejected() {
        let mut stored = SerializableModel::from_model(&trained_model());
        stored.rho.push(0.0);
        assert!(matches!(
            stored.to_trained(),
            Err(SVMError::SerializationError(_))
        ));

        let mut stored = SerializableModel::from_model(&trained_model());
        stored.n_sv[0] += 1;
        assert!(stored.validate().is_err());

        let mut stored = SerializableModel::from_model(&trained_model());
        stored.sv_coef[0].pop();
        assert!(stored.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SerializableModel::load_from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(SVMError::IoError(_))));
    }
}
