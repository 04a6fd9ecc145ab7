//! Data loading
//!
//! Loaders turn labeled text files into a label vector and a dense
//! row-major [`Matrix`], the same shape a host hands to
//! [`Session::problem_create`](crate::api::Session::problem_create).

pub mod csv;
pub mod libsvm;

pub use self::csv::CSVDataset;
pub use self::libsvm::LibSVMDataset;

use crate::core::{Matrix, Result};
use crate::problem::Problem;
use log::warn;
use std::path::Path;

/// Labeled rows with dense features
pub trait Dataset {
    fn labels(&self) -> &[f64];

    fn features(&self) -> &Matrix;

    /// Number of rows
    fn len(&self) -> usize {
        self.labels().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of feature columns
    fn dim(&self) -> usize {
        self.features().columns()
    }

    fn to_problem(&self) -> Result<Problem> {
        Problem::from_matrix(self.labels(), self.features())
    }
}

/// Text layout of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    LibSvm,
}

/// Guess the format from the file extension, defaulting to libsvm
pub fn detect_format(path: &Path) -> DataFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => DataFormat::Csv,
        Some("libsvm") | Some("svm") => DataFormat::LibSvm,
        Some(_) => {
            warn!("Unknown file extension, assuming LibSVM format");
            DataFormat::LibSvm
        }
        None => {
            warn!("No file extension, assuming LibSVM format");
            DataFormat::LibSvm
        }
    }
}

/// Load a data file in the given format
pub fn load<P: AsRef<Path>>(path: P, format: DataFormat) -> Result<Box<dyn Dataset>> {
    Ok(match format {
        DataFormat::Csv => Box::new(CSVDataset::from_file(path)?),
        DataFormat::LibSvm => Box::new(LibSVMDataset::from_file(path)?),
    })
}
