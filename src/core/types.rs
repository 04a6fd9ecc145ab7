//! Core type definitions shared by problems, parameters and models

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SVM formulation, numbered as in libsvm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum SvmType {
    /// C-support vector classification
    CSvc = 0,
    /// nu-support vector classification
    NuSvc = 1,
    /// One-class SVM (distribution estimation)
    OneClass = 2,
    /// epsilon-support vector regression
    EpsilonSvr = 3,
    /// nu-support vector regression
    NuSvr = 4,
}

impl SvmType {
    /// Integer code used by hosts and model files
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether the formulation produces class labels
    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::NuSvc)
    }
}

impl TryFrom<i32> for SvmType {
    type Error = SVMError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(SvmType::CSvc),
            1 => Ok(SvmType::NuSvc),
            2 => Ok(SvmType::OneClass),
            3 => Ok(SvmType::EpsilonSvr),
            4 => Ok(SvmType::NuSvr),
            _ => Err(SVMError::InvalidParameter("unknown svm type".to_string())),
        }
    }
}

/// Kernel function, numbered as in libsvm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum KernelType {
    /// `x·y`
    Linear = 0,
    /// `(γ·x·y + coef0)^degree`
    Polynomial = 1,
    /// `exp(-γ·|x-y|²)`
    Rbf = 2,
    /// `tanh(γ·x·y + coef0)`
    Sigmoid = 3,
    /// Kernel values supplied by the caller
    Precomputed = 4,
}

impl KernelType {
    /// Integer code used by hosts and model files
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for KernelType {
    type Error = SVMError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(KernelType::Linear),
            1 => Ok(KernelType::Polynomial),
            2 => Ok(KernelType::Rbf),
            3 => Ok(KernelType::Sigmoid),
            4 => Ok(KernelType::Precomputed),
            _ => Err(SVMError::InvalidParameter("unknown kernel type".to_string())),
        }
    }
}

/// One `(index, value)` pair of a solver row
///
/// Indices are 1-based feature columns. Rows are slices, so no `-1`
/// sentinel node is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmNode {
    pub index: i32,
    pub value: f64,
}

impl SvmNode {
    pub fn new(index: i32, value: f64) -> Self {
        Self { index, value }
    }
}

/// Encode a dense feature row as nodes `1..=len`, zeros included
pub fn dense_to_nodes(values: &[f64]) -> Vec<SvmNode> {
    values
        .iter()
        .enumerate()
        .map(|(j, &value)| SvmNode::new(j as i32 + 1, value))
        .collect()
}

/// Kind of instance a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Problem,
    Parameter,
    Model,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Problem => write!(f, "problem"),
            Kind::Parameter => write!(f, "parameter"),
            Kind::Model => write!(f, "model"),
        }
    }
}

/// Dense row-major matrix as supplied by a host
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    columns: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Create a matrix, checking that `values` holds exactly `rows * columns` entries
    pub fn new(rows: usize, columns: usize, values: Vec<f64>) -> Result<Self> {
        let expected = rows.checked_mul(columns).ok_or_else(|| {
            SVMError::InvalidShape(format!("{rows} x {columns} matrix is too large"))
        })?;
        if values.len() != expected {
            return Err(SVMError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            values,
        })
    }

    /// Build a matrix from equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * columns);
        for row in rows {
            if row.len() != columns {
                return Err(SVMError::DimensionMismatch {
                    expected: columns,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::new(rows.len(), columns, values)
    }

    pub fn empty() -> Self {
        Self {
            rows: 0,
            columns: 0,
            values: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Row-major values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row `i` as a slice
    ///
    /// # Panics
    /// Panics if `i >= rows()`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.columns..(i + 1) * self.columns]
    }
}

/// One cell of a host-visible result
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Empty => Ok(()),
        }
    }
}

/// Row-major table of cells returned by query operations
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid filled with empty cells
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![Cell::Empty; rows * columns],
        }
    }

    /// Two-row grid with keys on top and values below
    pub fn from_record(record: &[(&str, f64)]) -> Self {
        let mut grid = Self::new(2, record.len());
        for (j, (key, value)) in record.iter().enumerate() {
            grid.set(0, j, *key);
            grid.set(1, j, *value);
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// # Panics
    /// Panics if the position is outside the grid
    pub fn get(&self, i: usize, j: usize) -> &Cell {
        assert!(i < self.rows && j < self.columns, "Grid index out of range");
        &self.cells[i * self.columns + j]
    }

    /// # Panics
    /// Panics if the position is outside the grid
    pub fn set(&mut self, i: usize, j: usize, cell: impl Into<Cell>) {
        assert!(i < self.rows && j < self.columns, "Grid index out of range");
        self.cells[i * self.columns + j] = cell.into();
    }

    /// Numeric value at a position, `None` for text or empty cells
    pub fn number(&self, i: usize, j: usize) -> Option<f64> {
        self.get(i, j).as_number()
    }

    /// Cells of row `i`
    pub fn row(&self, i: usize) -> &[Cell] {
        &self.cells[i * self.columns..(i + 1) * self.columns]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            let line: Vec<String> = self.row(i).iter().map(|c| c.to_string()).collect();
            writeln!(f, "{}", line.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_codes_follow_libsvm() {
        assert_eq!(SvmType::try_from(0).unwrap(), SvmType::CSvc);
        assert_eq!(SvmType::try_from(4).unwrap(), SvmType::NuSvr);
        assert_eq!(KernelType::try_from(2).unwrap(), KernelType::Rbf);
        assert_eq!(KernelType::Precomputed.code(), 4);
        assert_eq!(SvmType::OneClass.code(), 2);
    }

    #[test]
    fn test_unknown_codes_rejected() {
        let err = SvmType::try_from(5).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter: unknown svm type");
        assert!(KernelType::try_from(-1).is_err());
    }

    #[test]
    fn test_dense_to_nodes_keeps_zeros() {
        let nodes = dense_to_nodes(&[0.0, 2.5, 0.0]);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], SvmNode::new(1, 0.0));
        assert_eq!(nodes[2].index, 3);
    }

    #[test]
    fn test_matrix_shape_checked() {
        assert!(Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).is_ok());
        assert!(matches!(
            Matrix::new(2, 2, vec![1.0, 2.0, 3.0]),
            Err(SVMError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(Matrix::new(usize::MAX, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_matrix_from_rows() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert!(Matrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert_eq!(Matrix::from_rows(&[]).unwrap().rows(), 0);
    }

    #[test]
    fn test_grid_record_layout() {
        let grid = Grid::from_record(&[("C", 1.0), ("nu", 0.5)]);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.get(0, 1), &Cell::Text("nu".to_string()));
        assert_eq!(grid.number(1, 0), Some(1.0));
        assert_eq!(grid.number(0, 0), None);
    }
}
