//! CSV format dataset implementation
//!
//! Supports loading datasets from CSV files where:
//! - The last column is the label
//! - All other columns are features
//! - First row can be headers (automatically detected)

use crate::core::{Matrix, Result, SVMError};
use crate::data::Dataset;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for CSV format files
#[derive(Debug, Clone)]
pub struct CSVDataset {
    labels: Vec<f64>,
    features: Matrix,
}

impl CSVDataset {
    /// Load a dataset from a CSV file
    ///
    /// The last column is assumed to be the label.
    /// Headers are automatically detected if present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(reader: R, auto_detect_header: bool) -> Result<Self> {
        let mut labels = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut first = true;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if first {
                first = false;
                if auto_detect_header && Self::is_header_line(line) {
                    continue;
                }
            }

            let (features, label) = Self::parse_data_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(previous) = rows.first() {
                if previous.len() != features.len() {
                    return Err(SVMError::ParseError(format!(
                        "Line {} has {} features, expected {}",
                        line_num + 1,
                        features.len(),
                        previous.len()
                    )));
                }
            }
            labels.push(label);
            rows.push(features);
        }

        if rows.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        Ok(CSVDataset {
            labels,
            features: Matrix::from_rows(&rows)?,
        })
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() < 2 {
            return false;
        }

        // Mostly non-numeric feature columns
        let non_numeric_count = fields
            .iter()
            .take(fields.len() - 1)
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric_count > fields.len() / 2
    }

    /// Parse a CSV data line into features and label
    fn parse_data_line(line: &str) -> Result<(Vec<f64>, f64)> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();

        if fields.len() < 2 {
            return Err(SVMError::ParseError(format!(
                "Line has too few fields: {line}"
            )));
        }

        let label_str = fields[fields.len() - 1];
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {label_str}")))?;

        let features = fields[..fields.len() - 1]
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                field.parse::<f64>().map_err(|_| {
                    SVMError::ParseError(format!(
                        "Invalid feature value at column {}: {}",
                        idx + 1,
                        field
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok((features, label))
    }
}

impl Dataset for CSVDataset {
    fn labels(&self) -> &[f64] {
        &self.labels
    }

    fn features(&self) -> &Matrix {
        &self.features
    }
}
