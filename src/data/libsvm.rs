//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Rows are expanded to dense form; features a row leaves out are zero.

use crate::core::{Matrix, Result, SVMError};
use crate::data::Dataset;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for LibSVM format files
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    labels: Vec<f64>,
    features: Matrix,
}

/// Largest index a node can carry
const MAX_FEATURE_INDEX: usize = i32::MAX as usize;

/// One parsed line: label and `(1-based index, value)` pairs
type SparseRow = (f64, Vec<(usize, f64)>);

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut parsed = Vec::new();
        let mut dimension = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let row = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(&(index, _)) = row.1.last() {
                dimension = dimension.max(index);
            }
            parsed.push(row);
        }

        if parsed.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let len = parsed.len().checked_mul(dimension).ok_or_else(|| {
            SVMError::InvalidShape(format!("{} x {dimension} dataset is too large", parsed.len()))
        })?;
        let mut values = Vec::new();
        values.try_reserve_exact(len).map_err(|_| {
            SVMError::Allocation(format!("{} x {dimension} dense features", parsed.len()))
        })?;
        values.resize(len, 0.0);

        let mut labels = Vec::with_capacity(parsed.len());
        for (i, (label, pairs)) in parsed.into_iter().enumerate() {
            labels.push(label);
            for (index, value) in pairs {
                values[i * dimension + index - 1] = value;
            }
        }

        Ok(LibSVMDataset {
            features: Matrix::new(labels.len(), dimension, values)?,
            labels,
        })
    }

    /// Parse a single line in libsvm format
    ///
    /// Indices must be positive and strictly increasing.
    fn parse_line(line: &str) -> Result<SparseRow> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut pairs = Vec::new();
        let mut last_index = 0;
        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index_str.parse::<usize>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;

            if index == 0 {
                return Err(SVMError::ParseError(format!(
                    "Feature index must be positive: {index}"
                )));
            }
            if index > MAX_FEATURE_INDEX {
                return Err(SVMError::ParseError(format!("Feature index out of range: {index}")));
            }
            if index <= last_index {
                return Err(SVMError::ParseError(format!(
                    "Feature indices must increase: {index} after {last_index}"
                )));
            }
            last_index = index;
            pairs.push((index, value));
        }

        Ok((label, pairs))
    }
}

impl Dataset for LibSVMDataset {
    fn labels(&self) -> &[f64] {
        &self.labels
    }

    fn features(&self) -> &Matrix {
        &self.features
    }
}
